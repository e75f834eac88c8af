use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditEntry, AuditEventKind};
use crate::decision::{apply_decision, decide_next_action, NextAction};
use crate::domain::lead::{Lead, LeadId};
use crate::errors::ApplicationError;
use crate::outreach::store::OutreachStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub lead: Lead,
    pub next: NextAction,
    pub applied: bool,
}

/// Evaluates the next action for one lead and, when `apply` is set, persists the
/// resulting status change and note.
pub async fn review_lead<S>(
    store: &S,
    lead_id: &LeadId,
    apply: bool,
    now: DateTime<Utc>,
) -> Result<DecisionReport, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let mut lead = store
        .find_lead(lead_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound { entity: "lead", id: lead_id.to_string() })?;

    let next = decide_next_action(&lead, now);
    // Opted-out leads keep their status whatever the rules say.
    let applied =
        apply && !lead.status.is_compliance_stop() && apply_decision(&mut lead, &next, now);

    if applied {
        store
            .update_lead_status(&lead.id, lead.status, next.append_note.as_deref(), now)
            .await?;
        store
            .append_audit(AuditEntry::new(
                None,
                Some(lead.id.clone()),
                AuditEventKind::DecisionApplied,
                format!("decision={} reason={}", next.decision.as_str(), next.reason),
                now,
            ))
            .await?;
        info!(
            event_name = "outreach.decision.applied",
            lead_id = %lead.id,
            decision = next.decision.as_str(),
            "decision applied"
        );
    }

    Ok(DecisionReport { lead, next, applied })
}
