use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::domain::action::Action;
use agencyvault_core::domain::lead::LeadId;
use agencyvault_core::outreach::{call_now, text_now, DryRunChannel};

use crate::commands::{with_store, CommandOutput, CommandResult};

/// Texts a lead right away through the dry-run channel.
pub fn text(overrides: ConfigOverrides, lead_id: String) -> CommandResult {
    with_store("text-now", overrides, |store, config| async move {
        let channel = DryRunChannel::default();
        let action = text_now(
            &store,
            &channel,
            &LeadId(lead_id),
            &config.planner.office_name,
            Utc::now(),
        )
        .await?;
        Ok(summary("text", action))
    })
}

/// Calls a lead right away through the dry-run channel.
pub fn call(overrides: ConfigOverrides, lead_id: String) -> CommandResult {
    with_store("call-now", overrides, |store, _config| async move {
        let channel = DryRunChannel::default();
        let action = call_now(&store, &channel, &LeadId(lead_id), Utc::now()).await?;
        Ok(summary("call", action))
    })
}

fn summary(verb: &str, action: Action) -> CommandOutput {
    CommandOutput::new(
        format!("{verb} for lead {} finished {}", action.lead_id, action.status.as_str()),
        action,
    )
}
