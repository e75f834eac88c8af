use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditEntry, AuditEventKind};
use crate::contact::clean_text;
use crate::domain::action::{Action, ActionId, ActionStatus};
use crate::domain::lead::{LeadMemoryKey, LeadStatus};
use crate::errors::{ApplicationError, DomainError};
use crate::outreach::store::OutreachStore;

const NOT_INTERESTED_NOTE: &str = "Closed by human: not interested.";

/// What a human reported after working an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanOutcome {
    Talked,
    NoAnswer,
    NotInterested,
    Booked,
}

impl HumanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Talked => "talked",
            Self::NoAnswer => "no_answer",
            Self::NotInterested => "not_interested",
            Self::Booked => "booked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "talked" => Some(Self::Talked),
            "no_answer" => Some(Self::NoAnswer),
            "not_interested" => Some(Self::NotInterested),
            "booked" => Some(Self::Booked),
            _ => None,
        }
    }
}

/// Closes an action with a human outcome. Terminal actions are rejected. NOT_INTERESTED
/// closes the lead unless it has already opted out.
pub async fn report_outcome<S>(
    store: &S,
    action_id: &ActionId,
    outcome: HumanOutcome,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Action, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let mut action = store.find_action(action_id).await?.ok_or_else(|| {
        ApplicationError::NotFound { entity: "action", id: action_id.to_string() }
    })?;

    if action.status == ActionStatus::Pending {
        action.start(now)?;
    }
    action.complete(now)?;
    store.save_action(&action).await?;

    let note = note.and_then(clean_text);
    if let Some(note) = &note {
        store.memory_set(&action.lead_id, LeadMemoryKey::LastHumanNote, note).await?;
    }

    if outcome == HumanOutcome::NotInterested {
        let lead = store.find_lead(&action.lead_id).await?.ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "action `{}` references missing lead `{}`",
                action.id, action.lead_id
            ))
        })?;
        if !lead.status.is_compliance_stop() {
            store.update_lead_status(&lead.id, LeadStatus::Closed, Some(NOT_INTERESTED_NOTE), now).await?;
        }
    }

    let detail = match &note {
        Some(note) => format!("outcome={} action={} note={note}", outcome.as_str(), action.id),
        None => format!("outcome={} action={}", outcome.as_str(), action.id),
    };
    store
        .append_audit(AuditEntry::new(
            None,
            Some(action.lead_id.clone()),
            AuditEventKind::HumanOutcome,
            detail,
            now,
        ))
        .await?;

    info!(
        event_name = "outreach.outcome.reported",
        action_id = %action.id,
        lead_id = %action.lead_id,
        outcome = outcome.as_str(),
        "human outcome recorded"
    );
    Ok(action)
}
