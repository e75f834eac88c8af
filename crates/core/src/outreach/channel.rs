use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::lead::LeadId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Outbound telephony provider used by the executor.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the provider's message id.
    async fn send_text(&self, to: &str, body: &str) -> Result<String, ChannelError>;

    /// Returns the provider's call id.
    async fn place_call(&self, to: &str, lead_id: &LeadId) -> Result<String, ChannelError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Text { to: String, body: String },
    Call { to: String, lead_id: LeadId },
}

/// Logs every dispatch instead of contacting a provider, and remembers what it was asked
/// to send.
#[derive(Debug, Default)]
pub struct DryRunChannel {
    dispatched: Mutex<Vec<Dispatch>>,
}

impl DryRunChannel {
    pub fn dispatched(&self) -> Vec<Dispatch> {
        self.dispatched.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    fn record(&self, dispatch: Dispatch) {
        if let Ok(mut guard) = self.dispatched.lock() {
            guard.push(dispatch);
        }
    }
}

#[async_trait]
impl OutboundChannel for DryRunChannel {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<String, ChannelError> {
        let provider_id = format!("dry-sms-{}", Uuid::new_v4());
        info!(
            event_name = "outreach.channel.text",
            channel = self.name(),
            to,
            provider_id = %provider_id,
            "dry-run text"
        );
        self.record(Dispatch::Text { to: to.to_string(), body: body.to_string() });
        Ok(provider_id)
    }

    async fn place_call(&self, to: &str, lead_id: &LeadId) -> Result<String, ChannelError> {
        let provider_id = format!("dry-call-{}", Uuid::new_v4());
        info!(
            event_name = "outreach.channel.call",
            channel = self.name(),
            to,
            lead_id = %lead_id,
            provider_id = %provider_id,
            "dry-run call"
        );
        self.record(Dispatch::Call { to: to.to_string(), lead_id: lead_id.clone() });
        Ok(provider_id)
    }
}
