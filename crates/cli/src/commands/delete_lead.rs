use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::domain::lead::LeadId;
use agencyvault_core::outreach::remove_lead;

use crate::commands::{with_store, CommandOutput, CommandResult};

pub fn run(overrides: ConfigOverrides, lead_id: String) -> CommandResult {
    with_store("delete-lead", overrides, |store, _config| async move {
        let removed = remove_lead(&store, &LeadId(lead_id), Utc::now()).await?;
        Ok(CommandOutput::new(format!("deleted lead {}", removed.id), removed))
    })
}
