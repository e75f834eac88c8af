//! Operator-triggered contact
//!
//! `text_now` and `call_now` skip the planner queue: they create the action, claim it and
//! dispatch it in one go, so the operator sees the provider result immediately. The action
//! rows they leave behind look exactly like executor work.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::audit::{AuditEntry, AuditEventKind};
use crate::contact::safe_first_name;
use crate::domain::action::{Action, ActionKind, ActionPayload};
use crate::domain::lead::{Lead, LeadId};
use crate::domain::message::Message;
use crate::errors::{ApplicationError, DomainError};
use crate::outreach::channel::OutboundChannel;
use crate::outreach::planner::greeting_suffix;
use crate::outreach::store::OutreachStore;

/// Sends the speed-to-lead text right away. A provider failure is recorded on the
/// returned action (FAILED) rather than returned as an error.
pub async fn text_now<S>(
    store: &S,
    channel: &dyn OutboundChannel,
    lead_id: &LeadId,
    office_name: &str,
    now: DateTime<Utc>,
) -> Result<Action, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let lead = contactable_lead(store, lead_id).await?;
    let message = format!(
        "Hi{}, this is {}. You requested life insurance information. \
         Do you want a quick quote now?",
        greeting_suffix(&safe_first_name(&lead.full_name)),
        office_name
    );
    let payload = ActionPayload {
        to: lead.phone.clone(),
        message: Some(message),
        reason: Some("Operator text-now".to_string()),
        ..ActionPayload::default()
    };
    run_now(store, channel, &lead, ActionKind::Text, payload, now).await
}

/// Bridges a call to the lead right away. Same failure handling as [`text_now`].
pub async fn call_now<S>(
    store: &S,
    channel: &dyn OutboundChannel,
    lead_id: &LeadId,
    now: DateTime<Utc>,
) -> Result<Action, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let lead = contactable_lead(store, lead_id).await?;
    let payload = ActionPayload {
        to: lead.phone.clone(),
        reason: Some("Operator call-now".to_string()),
        ..ActionPayload::default()
    };
    run_now(store, channel, &lead, ActionKind::Call, payload, now).await
}

async fn contactable_lead<S>(store: &S, lead_id: &LeadId) -> Result<Lead, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let lead = store
        .find_lead(lead_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound { entity: "lead", id: lead_id.to_string() })?;
    if lead.status.is_compliance_stop() {
        return Err(DomainError::ContactBlocked { status: lead.status.as_str() }.into());
    }
    if lead.phone.as_deref().map_or(true, |phone| phone.trim().is_empty()) {
        return Err(DomainError::InvariantViolation(format!("lead `{lead_id}` has no phone")).into());
    }
    Ok(lead)
}

async fn run_now<S>(
    store: &S,
    channel: &dyn OutboundChannel,
    lead: &Lead,
    kind: ActionKind,
    payload: ActionPayload,
    now: DateTime<Utc>,
) -> Result<Action, ApplicationError>
where
    S: OutreachStore + ?Sized,
{
    let to = payload.to.clone().unwrap_or_default();
    let body = payload.message.clone();

    let mut action = Action::pending(lead.id.clone(), kind, payload, now, now);
    store.save_action(&action).await?;
    action.start(now)?;
    if !store.claim_action(&action).await? {
        return Err(DomainError::InvariantViolation(format!(
            "action `{}` was claimed by another worker",
            action.id
        ))
        .into());
    }

    let sent = match kind {
        ActionKind::Call => channel.place_call(&to, &lead.id).await,
        _ => channel.send_text(&to, body.as_deref().unwrap_or_default()).await,
    };
    let (sent_event, failed_event) = match kind {
        ActionKind::Call => (AuditEventKind::CallNowStarted, AuditEventKind::CallNowFailed),
        _ => (AuditEventKind::TextNowSent, AuditEventKind::TextNowFailed),
    };

    match sent {
        Ok(provider_id) => {
            action.complete(now)?;
            store.save_action(&action).await?;
            store.record_touch(&lead.id, kind == ActionKind::Call, now).await?;
            if let Some(body) = body {
                store
                    .record_message(&Message::outbound(lead.id.clone(), to, body, provider_id.clone(), now))
                    .await?;
            }
            store
                .append_audit(AuditEntry::new(
                    None,
                    Some(lead.id.clone()),
                    sent_event,
                    format!("action_id={} provider_id={provider_id}", action.id),
                    now,
                ))
                .await?;
            info!(
                event_name = "outreach.manual.dispatched",
                lead_id = %lead.id,
                action_id = %action.id,
                kind = kind.as_str(),
                "operator contact dispatched"
            );
        }
        Err(send_error) => {
            action.fail(send_error.to_string(), now)?;
            store.save_action(&action).await?;
            store
                .append_audit(AuditEntry::new(
                    None,
                    Some(lead.id.clone()),
                    failed_event,
                    format!("action_id={} error={send_error}", action.id),
                    now,
                ))
                .await?;
            warn!(
                event_name = "outreach.manual.failed",
                lead_id = %lead.id,
                action_id = %action.id,
                kind = kind.as_str(),
                error = %send_error,
                "operator contact failed"
            );
        }
    }
    Ok(action)
}
