use std::sync::Arc;

use agencyvault_core::chrono::Utc;
use agencyvault_core::config::ConfigOverrides;
use agencyvault_core::outreach::{DryRunChannel, OutreachExecutor};

use crate::commands::{with_store, CommandOutput, CommandResult};

/// Executes due actions through the dry-run channel.
pub fn run(overrides: ConfigOverrides, limit: Option<u32>) -> CommandResult {
    let overrides = ConfigOverrides {
        executor_batch_limit: limit.or(overrides.executor_batch_limit),
        ..overrides
    };

    with_store("execute", overrides, |store, config| async move {
        let executor =
            OutreachExecutor::new(Arc::new(DryRunChannel::default()), config.executor.settings());
        let report = executor.execute_due(&store, Utc::now()).await?;
        Ok(CommandOutput::new(
            format!(
                "executed {} of {} actions ({} failed, {} skipped, {} deferred)",
                report.executed, report.considered, report.failed, report.skipped, report.deferred
            ),
            report,
        ))
    })
}
