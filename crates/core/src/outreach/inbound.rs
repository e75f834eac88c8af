use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditEntry, AuditEventKind};
use crate::compliance::{classify_inbound_text, InboundIntent};
use crate::contact::{clean_text, normalize_phone};
use crate::domain::lead::{LeadId, LeadMemoryKey, LeadStatus};
use crate::domain::message::Message;
use crate::errors::ApplicationError;
use crate::outreach::notify::{AlertSubject, AlertTag, OwnerNotifier};
use crate::outreach::store::OutreachStore;

pub const STOP_CANCEL_REASON: &str = "Canceled: inbound STOP";
const OPT_OUT_NOTE: &str = "Opted out by inbound STOP.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundReport {
    pub lead_id: Option<LeadId>,
    pub intent: InboundIntent,
    pub new_status: Option<LeadStatus>,
    pub canceled_actions: u32,
}

/// Routes an inbound SMS to its lead. Unknown senders are audited and forwarded to the
/// owner, and otherwise ignored.
///
/// Status changes are written as status-only updates so a concurrent executor touch or
/// planner commit never resurrects an older row.
pub async fn handle_inbound_text<S>(
    store: &S,
    notifier: &OwnerNotifier,
    from: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<InboundReport, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let text = clean_text(body).unwrap_or_default();
    let intent = classify_inbound_text(&text);
    let sender = normalize_phone(from);

    let lead = match sender.as_deref() {
        Some(phone) => store.find_lead_by_phone(phone).await?,
        None => None,
    };

    let Some(lead) = lead else {
        store
            .append_audit(AuditEntry::new(
                None,
                None,
                AuditEventKind::SmsInUnknown,
                format!("from={from} intent={} body={text}", intent.as_str()),
                now,
            ))
            .await?;
        info!(
            event_name = "outreach.inbound.unknown_sender",
            intent = intent.as_str(),
            "inbound sms from unknown sender"
        );
        let display = sender.as_deref().unwrap_or(from.trim());
        notifier
            .alert(store, AlertSubject::UnknownSender(display), AlertTag::LeadRepliedUnknown, &text, now)
            .await;
        return Ok(InboundReport { lead_id: None, intent, new_status: None, canceled_actions: 0 });
    };

    store
        .record_message(&Message::inbound(
            lead.id.clone(),
            sender.unwrap_or_else(|| from.trim().to_string()),
            text.clone(),
            now,
        ))
        .await?;
    store
        .append_audit(AuditEntry::new(
            None,
            Some(lead.id.clone()),
            AuditEventKind::SmsIn,
            format!("intent={} body={text}", intent.as_str()),
            now,
        ))
        .await?;
    notifier.alert(store, AlertSubject::Lead(&lead), AlertTag::LeadReplied, &text, now).await;

    if intent == InboundIntent::Stop {
        store.update_lead_status(&lead.id, LeadStatus::DoNotContact, Some(OPT_OUT_NOTE), now).await?;

        let mut canceled = 0_u32;
        for mut action in store.pending_actions_for_lead(&lead.id).await? {
            action.skip(STOP_CANCEL_REASON, now)?;
            store.save_action(&action).await?;
            canceled += 1;
        }

        store
            .append_audit(AuditEntry::new(
                None,
                Some(lead.id.clone()),
                AuditEventKind::ComplianceDnc,
                "Lead opted out; status set to DO_NOT_CONTACT".to_string(),
                now,
            ))
            .await?;
        if canceled > 0 {
            store
                .append_audit(AuditEntry::new(
                    None,
                    Some(lead.id.clone()),
                    AuditEventKind::ActionsCanceled,
                    format!("canceled={canceled}"),
                    now,
                ))
                .await?;
        }

        info!(
            event_name = "outreach.inbound.opt_out",
            lead_id = %lead.id,
            canceled,
            "lead opted out"
        );
        notifier
            .alert(store, AlertSubject::Lead(&lead), AlertTag::Dnc, "Lead opted out (STOP/DNC).", now)
            .await;
        return Ok(InboundReport {
            lead_id: Some(lead.id),
            intent,
            new_status: Some(LeadStatus::DoNotContact),
            canceled_actions: canceled,
        });
    }

    store.memory_set(&lead.id, LeadMemoryKey::LastInboundIntent, intent.as_str()).await?;
    store.memory_set(&lead.id, LeadMemoryKey::LastInboundText, &text).await?;

    let new_status = if lead.status.is_compliance_stop() {
        None
    } else if intent.is_engaged() {
        Some(LeadStatus::Contacted)
    } else {
        Some(LeadStatus::Working)
    };

    if let Some(status) = new_status {
        store.update_lead_status(&lead.id, status, None, now).await?;
    }

    if matches!(intent, InboundIntent::Hot | InboundIntent::Appt) {
        let wake = format!("WAKE: Lead intent={}. Call now.", intent.as_str());
        notifier.alert(store, AlertSubject::Lead(&lead), AlertTag::WakeForMoney, &wake, now).await;
    }

    Ok(InboundReport { lead_id: Some(lead.id), intent, new_status, canceled_actions: 0 })
}
