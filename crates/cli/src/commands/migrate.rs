use agencyvault_core::config::ConfigOverrides;

use crate::commands::{with_store, CommandOutput, CommandResult};

pub fn run(overrides: ConfigOverrides) -> CommandResult {
    with_store("migrate", overrides, |_store, config| async move {
        Ok(CommandOutput {
            message: format!("applied pending migrations to `{}`", config.database.url),
            data: None,
        })
    })
}
