use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::outreach::OutreachPlanner;

use crate::commands::{with_store, CommandOutput, CommandResult};

/// Runs one planning batch. `batch_size` overrides the configured size for this run.
pub fn run(overrides: ConfigOverrides, batch_size: Option<u32>) -> CommandResult {
    let overrides =
        ConfigOverrides { planner_batch_size: batch_size.or(overrides.planner_batch_size), ..overrides };

    with_store("plan", overrides, |store, config| async move {
        let planner = OutreachPlanner::new(config.planner.settings());
        let report = planner.plan_actions(&store, Utc::now()).await?;
        Ok(CommandOutput::new(
            format!(
                "planned {} actions across {} leads",
                report.planned_actions, report.considered
            ),
            report,
        ))
    })
}
