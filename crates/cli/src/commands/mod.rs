pub mod add_lead;
pub mod config;
pub mod contact_now;
pub mod decide;
pub mod delete_lead;
pub mod doctor;
pub mod execute;
pub mod migrate;
pub mod plan;
pub mod seed;

use std::future::Future;

use agencyvault_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use agencyvault_core::errors::ApplicationError;
use agencyvault_db::{connect_with_config, migrations, SqlOutreachStore};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// What a command body hands back on success.
pub struct CommandOutput {
    pub message: String,
    pub data: Option<Value>,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>, data: impl Serialize) -> Self {
        Self { message: message.into(), data: serde_json::to_value(data).ok() }
    }
}

/// Loads config, opens the database, applies pending migrations, and runs `body`
/// against the store on a single-threaded runtime.
///
/// Exit codes: 2 config, 3 runtime, 4 connectivity, 5 migration, 6 command failure.
pub(crate) fn with_store<F, Fut>(
    command: &str,
    overrides: ConfigOverrides,
    body: F,
) -> CommandResult
where
    F: FnOnce(SqlOutreachStore, AppConfig) -> Fut,
    Fut: Future<Output = anyhow::Result<CommandOutput>>,
{
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = body(SqlOutreachStore::new(pool.clone()), config)
            .await
            .map_err(|error| (error_class(&error), format!("{error:#}"), 6u8));
        pool.close().await;
        outcome
    });

    match result {
        Ok(output) => CommandResult::success_with(command, output.message, output.data),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

fn error_class(error: &anyhow::Error) -> &'static str {
    match error.downcast_ref::<ApplicationError>() {
        Some(ApplicationError::Domain(_)) => "domain",
        Some(ApplicationError::NotFound { .. }) => "not_found",
        Some(ApplicationError::Persistence(_)) => "persistence",
        Some(ApplicationError::Integration(_)) => "integration",
        Some(ApplicationError::Configuration(_)) => "config_validation",
        None => "command",
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
