use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::action::truncate;
use crate::domain::lead::LeadId;
use crate::domain::run::RunId;

const MAX_DETAIL_CHARS: usize = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    TextPlanned,
    CallPlanned,
    NudgePlanned,
    NudgeSuppressed,
    ReviewPlanned,
    Quarantined,
    SkipQuarantined,
    AiPlanned,
    PlannerFailed,
    ExecutorTick,
    ExecutorDone,
    ExecutorFailed,
    TextSent,
    CallStarted,
    ActionFailed,
    ActionSkippedDnc,
    ActionError,
    DecisionApplied,
    LeadCreated,
    SmsIn,
    SmsInUnknown,
    ComplianceDnc,
    ActionsCanceled,
    HumanOutcome,
    PlanStale,
    ActionInterrupted,
    OwnerNotified,
    OwnerNotifyFailed,
    TextNowSent,
    TextNowFailed,
    CallNowStarted,
    CallNowFailed,
    LeadDeleted,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextPlanned => "TEXT_PLANNED",
            Self::CallPlanned => "CALL_PLANNED",
            Self::NudgePlanned => "NUDGE_PLANNED",
            Self::NudgeSuppressed => "NUDGE_SUPPRESSED",
            Self::ReviewPlanned => "REVIEW_PLANNED",
            Self::Quarantined => "QUARANTINED",
            Self::SkipQuarantined => "SKIP_QUARANTINED",
            Self::AiPlanned => "AI_PLANNED",
            Self::PlannerFailed => "PLANNER_FAILED",
            Self::ExecutorTick => "EXECUTOR_TICK",
            Self::ExecutorDone => "EXECUTOR_DONE",
            Self::ExecutorFailed => "EXECUTOR_FAILED",
            Self::TextSent => "TEXT_SENT",
            Self::CallStarted => "CALL_STARTED",
            Self::ActionFailed => "ACTION_FAILED",
            Self::ActionSkippedDnc => "ACTION_SKIPPED_DNC",
            Self::ActionError => "ACTION_ERROR",
            Self::DecisionApplied => "DECISION_APPLIED",
            Self::LeadCreated => "LEAD_CREATED",
            Self::SmsIn => "SMS_IN",
            Self::SmsInUnknown => "SMS_IN_UNKNOWN",
            Self::ComplianceDnc => "COMPLIANCE_DNC",
            Self::ActionsCanceled => "ACTIONS_CANCELED",
            Self::HumanOutcome => "HUMAN_OUTCOME",
            Self::PlanStale => "PLAN_STALE",
            Self::ActionInterrupted => "ACTION_INTERRUPTED",
            Self::OwnerNotified => "OWNER_NOTIFIED",
            Self::OwnerNotifyFailed => "OWNER_NOTIFY_FAILED",
            Self::TextNowSent => "TEXT_NOW_SENT",
            Self::TextNowFailed => "TEXT_NOW_FAILED",
            Self::CallNowStarted => "CALL_NOW_STARTED",
            Self::CallNowFailed => "CALL_NOW_FAILED",
            Self::LeadDeleted => "LEAD_DELETED",
        }
    }
}

/// Append-only audit record. `event` stays a plain string in storage so older rows
/// with retired event names still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub run_id: Option<RunId>,
    pub lead_id: Option<LeadId>,
    pub event: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        run_id: Option<RunId>,
        lead_id: Option<LeadId>,
        event: AuditEventKind,
        detail: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id,
            lead_id,
            event: event.as_str().to_string(),
            detail: truncate(detail.into(), MAX_DETAIL_CHARS),
            created_at: now,
        }
    }

    pub fn is(&self, event: AuditEventKind) -> bool {
        self.event == event.as_str()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::audit::{AuditEntry, AuditEventKind};
    use crate::domain::lead::LeadId;
    use crate::domain::run::RunId;

    #[test]
    fn entry_keeps_run_and_lead_scope_and_truncates_detail() {
        let entry = AuditEntry::new(
            Some(RunId("run-1".to_owned())),
            Some(LeadId("L-7".to_owned())),
            AuditEventKind::Quarantined,
            "é".repeat(6000),
            Utc::now(),
        );

        assert_eq!(entry.event, "QUARANTINED");
        assert!(entry.is(AuditEventKind::Quarantined));
        assert_eq!(entry.run_id.as_ref().map(|id| id.0.as_str()), Some("run-1"));
        assert_eq!(entry.lead_id.as_ref().map(|id| id.0.as_str()), Some("L-7"));
        assert_eq!(entry.detail.chars().count(), 5000);
    }
}
