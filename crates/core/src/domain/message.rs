use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::action::truncate;
use crate::domain::lead::LeadId;

const MAX_BODY_CHARS: usize = 1600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "IN",
            Self::Outbound => "OUT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::Inbound),
            "OUT" => Some(Self::Outbound),
            _ => None,
        }
    }
}

/// One SMS exchanged with a lead, kept as the conversation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub lead_id: LeadId,
    pub direction: MessageDirection,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub body: String,
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn inbound(
        lead_id: LeadId,
        from_number: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id,
            direction: MessageDirection::Inbound,
            from_number: Some(from_number.into()),
            to_number: None,
            body: truncate(body.into(), MAX_BODY_CHARS),
            provider_id: None,
            created_at: now,
        }
    }

    pub fn outbound(
        lead_id: LeadId,
        to_number: impl Into<String>,
        body: impl Into<String>,
        provider_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id,
            direction: MessageDirection::Outbound,
            from_number: None,
            to_number: Some(to_number.into()),
            body: truncate(body.into(), MAX_BODY_CHARS),
            provider_id: Some(provider_id.into()),
            created_at: now,
        }
    }
}
