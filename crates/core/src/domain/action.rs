use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Text,
    Call,
    Review,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Call => "CALL",
            Self::Review => "REVIEW",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Some(Self::Text),
            "CALL" => Some(Self::Call),
            "REVIEW" => Some(Self::Review),
            _ => None,
        }
    }

    /// Routing hint for whoever consumes the action.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Text | Self::Call => "telephony",
            Self::Review => "human",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "DONE" => Some(Self::Done),
            "FAILED" => Some(Self::Failed),
            "SKIPPED" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }
}

/// Serialized into the `payload_json` column; consumers read `due_at` from here as well.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub lead_id: LeadId,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub tool: String,
    pub payload: ActionPayload,
    pub due_at: DateTime<Utc>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Action {
    pub fn pending(
        lead_id: LeadId,
        kind: ActionKind,
        mut payload: ActionPayload,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        payload.due_at = Some(due_at);
        Self {
            id: ActionId::generate(),
            lead_id,
            kind,
            status: ActionStatus::Pending,
            tool: kind.tool().to_string(),
            payload,
            due_at,
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ActionStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ActionStatus::Done)?;
        self.error = None;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ActionStatus::Failed)?;
        self.error = Some(truncate(error.into(), 2000));
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn skip(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ActionStatus::Skipped)?;
        self.error = Some(truncate(reason.into(), 2000));
        self.finished_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, to: ActionStatus) -> Result<(), DomainError> {
        let allowed = match (self.status, to) {
            (from, _) if from.is_terminal() => false,
            (ActionStatus::Pending, _) => true,
            (ActionStatus::Running, ActionStatus::Done)
            | (ActionStatus::Running, ActionStatus::Failed)
            | (ActionStatus::Running, ActionStatus::Skipped) => true,
            _ => false,
        };

        if !allowed {
            return Err(DomainError::InvalidActionTransition { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }
}

pub(crate) fn truncate(mut value: String, max_chars: usize) -> String {
    if let Some((index, _)) = value.char_indices().nth(max_chars) {
        value.truncate(index);
    }
    value
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Action, ActionKind, ActionPayload, ActionStatus};
    use crate::domain::lead::LeadId;
    use crate::errors::DomainError;

    fn sample_action() -> Action {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).single().expect("valid time");
        Action::pending(
            LeadId("L-1".to_string()),
            ActionKind::Call,
            ActionPayload { to: Some("+15551234567".to_string()), ..ActionPayload::default() },
            now + Duration::minutes(2),
            now,
        )
    }

    #[test]
    fn action_kind_and_status_round_trip_from_storage_encoding() {
        for kind in [ActionKind::Text, ActionKind::Call, ActionKind::Review] {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        for status in [
            ActionStatus::Pending,
            ActionStatus::Running,
            ActionStatus::Done,
            ActionStatus::Failed,
            ActionStatus::Skipped,
        ] {
            assert_eq!(ActionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn pending_action_carries_due_time_in_payload() {
        let action = sample_action();

        assert_eq!(action.payload.due_at, Some(action.due_at));
        assert_eq!(action.tool, "telephony");
        assert!(!action.is_due(action.created_at));
        assert!(action.is_due(action.due_at));
    }

    #[test]
    fn done_actions_are_immutable() {
        let mut action = sample_action();
        let now = action.due_at;

        action.start(now).expect("pending -> running");
        action.complete(now).expect("running -> done");

        let error = action.fail("late failure", now).expect_err("done must stay done");
        assert_eq!(
            error,
            DomainError::InvalidActionTransition {
                from: ActionStatus::Done,
                to: ActionStatus::Failed
            }
        );
        assert!(action.start(now).is_err());
        assert_eq!(action.status, ActionStatus::Done);
    }

    #[test]
    fn running_action_cannot_return_to_running() {
        let mut action = sample_action();
        let now = action.due_at;

        action.start(now).expect("pending -> running");

        assert!(action.start(now).is_err());
    }

    #[test]
    fn failure_message_is_truncated() {
        let mut action = sample_action();
        action.fail("x".repeat(5000), action.due_at).expect("pending -> failed");

        assert_eq!(action.error.as_deref().map(str::len), Some(2000));
    }
}
