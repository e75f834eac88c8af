use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::domain::lead::LeadId;
use agencyvault_core::outreach::review_lead;

use crate::commands::{with_store, CommandOutput, CommandResult};

pub fn run(overrides: ConfigOverrides, lead_id: String, apply: bool) -> CommandResult {
    with_store("decide", overrides, |store, _config| async move {
        let report = review_lead(&store, &LeadId(lead_id), apply, Utc::now()).await?;
        let verb = if report.applied { "applied" } else { "previewed" };
        Ok(CommandOutput::new(
            format!("{verb} {} for lead {}", report.next.decision.as_str(), report.lead.id),
            report,
        ))
    })
}
