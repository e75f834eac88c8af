use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::outreach::{create_lead, NewLead};

use crate::commands::{with_store, CommandOutput, CommandResult};

pub fn run(overrides: ConfigOverrides, input: NewLead) -> CommandResult {
    with_store("add-lead", overrides, |store, _config| async move {
        let lead = create_lead(&store, input, Utc::now()).await?;
        Ok(CommandOutput::new(format!("created lead {}", lead.id), lead))
    })
}
