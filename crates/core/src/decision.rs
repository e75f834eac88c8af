//! Next-action decision procedure for a single lead.
//!
//! [`decide_next_action`] is read-only: it inspects a lead and returns a structured
//! recommendation. Persisting the recommendation is up to the caller, usually through
//! [`apply_decision`] followed by a status-only store write.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::{Lead, LeadStatus};

pub const MAX_ATTEMPTS: u32 = 5;
pub const COOLDOWN_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    DoNotCall,
    CloseOut,
    Wait,
    Ready,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoNotCall => "DO_NOT_CALL",
            Self::CloseOut => "CLOSE_OUT",
            Self::Wait => "WAIT",
            Self::Ready => "READY",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub decision: Decision,
    pub reason: String,
    pub new_status: Option<LeadStatus>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub append_note: Option<String>,
}

impl NextAction {
    fn new(decision: Decision, reason: &str) -> Self {
        Self {
            decision,
            reason: reason.to_string(),
            new_status: None,
            cooldown_until: None,
            append_note: None,
        }
    }

    /// True when applying this decision would change the persisted lead.
    pub fn mutates(&self) -> bool {
        self.new_status.is_some() || self.append_note.is_some()
    }
}

pub fn decide_next_action(lead: &Lead, now: DateTime<Utc>) -> NextAction {
    if lead.status == LeadStatus::Dnc {
        return NextAction::new(Decision::DoNotCall, "Lead marked as DNC");
    }

    if lead.dial_score.is_some_and(|score| score >= MAX_ATTEMPTS) {
        return NextAction {
            new_status: Some(LeadStatus::Closed),
            append_note: Some("Closed by AI: max attempts reached.".to_string()),
            ..NextAction::new(Decision::CloseOut, "Max attempts reached")
        };
    }

    if let Some(dialed_at) = lead.dialed_at {
        let cooldown_until = dialed_at + Duration::hours(COOLDOWN_HOURS);
        if now < cooldown_until {
            return NextAction {
                cooldown_until: Some(cooldown_until),
                ..NextAction::new(Decision::Wait, "Cooldown window active")
            };
        }
    }

    NextAction {
        new_status: Some(LeadStatus::Ready),
        append_note: Some("AI marked lead as ready for next action.".to_string()),
        ..NextAction::new(Decision::Ready, "Eligible for contact")
    }
}

/// Applies a decision's status change and note to an in-memory lead. Returns whether
/// anything changed.
pub fn apply_decision(lead: &mut Lead, next: &NextAction, now: DateTime<Utc>) -> bool {
    if !next.mutates() {
        return false;
    }
    if let Some(status) = next.new_status {
        lead.status = status;
    }
    if let Some(note) = &next.append_note {
        lead.append_note(note);
    }
    lead.updated_at = now;
    true
}
