use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use agencyvault_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective configuration with per-field source attribution. Secrets are redacted.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &'static str, env_keys: &[&str]| {
        field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let entry = |key: &'static str, value: String, env_keys: &[&str]| ConfigEntry {
        key,
        value,
        source: source(key, env_keys),
    };

    let admin_token =
        if config.server.admin_token.is_some() { "<redacted>" } else { "<unset>" }.to_string();

    let entries = vec![
        entry("database.url", config.database.url.clone(), &["AGENCYVAULT_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["AGENCYVAULT_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["AGENCYVAULT_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["AGENCYVAULT_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["AGENCYVAULT_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["AGENCYVAULT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "server.admin_token",
            admin_token,
            &["AGENCYVAULT_SERVER_ADMIN_TOKEN", "AGENCYVAULT_ADMIN_TOKEN"],
        ),
        entry(
            "planner.batch_size",
            config.planner.batch_size.to_string(),
            &["AGENCYVAULT_PLANNER_BATCH_SIZE"],
        ),
        entry(
            "planner.call_delay_secs",
            config.planner.call_delay_secs.to_string(),
            &["AGENCYVAULT_PLANNER_CALL_DELAY_SECS"],
        ),
        entry(
            "planner.nudge_delay_secs",
            config.planner.nudge_delay_secs.to_string(),
            &["AGENCYVAULT_PLANNER_NUDGE_DELAY_SECS"],
        ),
        entry(
            "planner.nudge_quiet_hours",
            config.planner.nudge_quiet_hours.to_string(),
            &["AGENCYVAULT_PLANNER_NUDGE_QUIET_HOURS"],
        ),
        entry(
            "planner.office_name",
            config.planner.office_name.clone(),
            &["AGENCYVAULT_PLANNER_OFFICE_NAME"],
        ),
        entry(
            "planner.interval_secs",
            config.planner.interval_secs.to_string(),
            &["AGENCYVAULT_PLANNER_INTERVAL_SECS"],
        ),
        entry(
            "executor.batch_limit",
            config.executor.batch_limit.to_string(),
            &["AGENCYVAULT_EXECUTOR_BATCH_LIMIT"],
        ),
        entry(
            "executor.interval_secs",
            config.executor.interval_secs.to_string(),
            &["AGENCYVAULT_EXECUTOR_INTERVAL_SECS"],
        ),
        entry(
            "executor.contact_window_start_hour",
            config.executor.contact_window_start_hour.to_string(),
            &["AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_START_HOUR"],
        ),
        entry(
            "executor.contact_window_end_hour",
            config.executor.contact_window_end_hour.to_string(),
            &["AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_END_HOUR"],
        ),
        entry(
            "executor.default_timezone",
            config.executor.default_timezone.clone(),
            &["AGENCYVAULT_EXECUTOR_DEFAULT_TIMEZONE"],
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["AGENCYVAULT_LOGGING_LEVEL", "AGENCYVAULT_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["AGENCYVAULT_LOGGING_FORMAT", "AGENCYVAULT_LOG_FORMAT"],
        ),
    ];

    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        serde_json::to_value(&entries).ok(),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
