use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_db::DemoSeedDataset;
use serde_json::json;

use crate::commands::{with_store, CommandOutput, CommandResult};

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    with_store("seed", overrides, |store, _config| async move {
        let pool = store.pool();
        let seeded = DemoSeedDataset::load(pool, Utc::now()).await?;
        let verification = DemoSeedDataset::verify(pool).await?;

        if !verification.all_present {
            anyhow::bail!("{}", verification_failure_message(&verification.checks));
        }

        let leads: Vec<_> = seeded
            .leads_seeded
            .iter()
            .map(|lead| json!({ "lead_id": lead.lead_id, "description": lead.description }))
            .collect();
        Ok(CommandOutput::new(
            format!("demo dataset loaded: {} leads", leads.len()),
            json!({ "leads": leads }),
        ))
    })
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for: {}", failed_checks.join(", "))
    }
}
