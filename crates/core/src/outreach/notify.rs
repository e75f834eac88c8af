//! Owner alerts
//!
//! Forwards lead replies and opt-outs to the agency owner's mobile through the same
//! [`OutboundChannel`] the executor uses. Every alert is audited whether or not a phone is
//! configured, and alert failures never fail the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditEntry, AuditEventKind};
use crate::domain::lead::Lead;
use crate::outreach::channel::OutboundChannel;
use crate::outreach::store::OutreachStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertTag {
    LeadReplied,
    LeadRepliedUnknown,
    WakeForMoney,
    Dnc,
}

impl AlertTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadReplied => "LEAD_REPLIED",
            Self::LeadRepliedUnknown => "LEAD_REPLIED_UNKNOWN",
            Self::WakeForMoney => "WAKE_FOR_MONEY",
            Self::Dnc => "DNC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertOutcome {
    Sent,
    /// Audited only; no owner phone configured.
    Logged,
    Failed,
}

/// Who the alert is about when the sender is not a known lead.
#[derive(Clone, Copy, Debug)]
pub enum AlertSubject<'a> {
    Lead(&'a Lead),
    UnknownSender(&'a str),
}

#[derive(Clone, Default)]
pub struct OwnerNotifier {
    channel: Option<Arc<dyn OutboundChannel>>,
    owner_phone: Option<String>,
}

impl OwnerNotifier {
    pub fn new(channel: Arc<dyn OutboundChannel>, owner_phone: Option<String>) -> Self {
        Self { channel: Some(channel), owner_phone }
    }

    /// Audits alerts without sending anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some() && self.owner_phone.is_some()
    }

    pub async fn alert<S>(
        &self,
        store: &S,
        subject: AlertSubject<'_>,
        tag: AlertTag,
        message: &str,
        now: DateTime<Utc>,
    ) -> AlertOutcome
    where
        S: OutreachStore + ?Sized,
    {
        let payload = alert_body(subject, tag, message);
        let lead_id = match subject {
            AlertSubject::Lead(lead) => Some(lead.id.clone()),
            AlertSubject::UnknownSender(_) => None,
        };

        let outcome = match (&self.channel, self.owner_phone.as_deref()) {
            (Some(channel), Some(owner_phone)) => {
                match channel.send_text(owner_phone, &payload).await {
                    Ok(provider_id) => {
                        info!(
                            event_name = "outreach.notify.sent",
                            tag = tag.as_str(),
                            provider_id = %provider_id,
                            "owner alerted"
                        );
                        AlertOutcome::Sent
                    }
                    Err(send_error) => {
                        warn!(
                            event_name = "outreach.notify.failed",
                            tag = tag.as_str(),
                            error = %send_error,
                            "owner alert failed"
                        );
                        let _ = store
                            .append_audit(AuditEntry::new(
                                None,
                                lead_id.clone(),
                                AuditEventKind::OwnerNotifyFailed,
                                format!("tag={} error={send_error}", tag.as_str()),
                                now,
                            ))
                            .await;
                        AlertOutcome::Failed
                    }
                }
            }
            _ => AlertOutcome::Logged,
        };

        if let Err(audit_error) = store
            .append_audit(AuditEntry::new(
                None,
                lead_id,
                AuditEventKind::OwnerNotified,
                payload,
                now,
            ))
            .await
        {
            warn!(
                event_name = "outreach.notify.audit_failed",
                tag = tag.as_str(),
                error = %audit_error,
                "could not audit owner alert"
            );
        }
        outcome
    }
}

fn alert_body(subject: AlertSubject<'_>, tag: AlertTag, message: &str) -> String {
    let who = match subject {
        AlertSubject::Lead(lead) => format!(
            "#{} {} {}",
            lead.id,
            lead.full_name,
            lead.phone.as_deref().unwrap_or_default()
        ),
        AlertSubject::UnknownSender(from) => format!("Unknown lead {from}"),
    };
    format!("{}\n{}\n\n{}", tag.as_str(), who.trim(), message.trim()).trim().to_string()
}
