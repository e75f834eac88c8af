use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compliance::ContactWindow;
use crate::contact::normalize_phone;
use crate::outreach::executor::ExecutorSettings;
use crate::outreach::planner::PlannerSettings;

pub const DEFAULT_CONFIG_FILE: &str = "agencyvault.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// When set, mutating HTTP routes require a matching `x-admin-token` header.
    pub admin_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub batch_size: u32,
    pub call_delay_secs: u64,
    pub nudge_delay_secs: u64,
    pub nudge_quiet_hours: u32,
    pub office_name: String,
    /// Background planner period; zero disables the server worker.
    pub interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub batch_limit: u32,
    /// Background executor period; zero disables the server worker.
    pub interval_secs: u64,
    pub contact_window_start_hour: u32,
    pub contact_window_end_hour: u32,
    pub default_timezone: String,
    /// RUNNING actions older than this are failed as interrupted on the next tick.
    pub running_timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct NotificationsConfig {
    /// Owner's mobile. Inbound replies and opt-outs are forwarded here when set.
    pub owner_phone: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub planner_batch_size: Option<u32>,
    pub executor_batch_limit: Option<u32>,
    pub admin_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://agencyvault.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                admin_token: None,
            },
            planner: PlannerConfig {
                batch_size: 25,
                call_delay_secs: 120,
                nudge_delay_secs: 300,
                nudge_quiet_hours: 20,
                office_name: "AgencyVault".to_string(),
                interval_secs: 300,
            },
            executor: ExecutorConfig {
                batch_limit: 20,
                interval_secs: 60,
                contact_window_start_hour: 8,
                contact_window_end_hour: 21,
                default_timezone: "America/Denver".to_string(),
                running_timeout_secs: 900,
            },
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PlannerConfig {
    pub fn settings(&self) -> PlannerSettings {
        PlannerSettings {
            batch_size: self.batch_size,
            call_delay: Duration::seconds(clamped_secs(self.call_delay_secs)),
            nudge_delay: Duration::seconds(clamped_secs(self.nudge_delay_secs)),
            nudge_quiet_period: Duration::hours(i64::from(
                self.nudge_quiet_hours.min(MAX_NUDGE_QUIET_HOURS),
            )),
            office_name: self.office_name.clone(),
        }
    }
}

impl ExecutorConfig {
    pub fn contact_window(&self) -> ContactWindow {
        let fallback = ContactWindow::default();
        ContactWindow {
            start_hour: self.contact_window_start_hour,
            end_hour: self.contact_window_end_hour,
            default_timezone: self
                .default_timezone
                .trim()
                .parse::<Tz>()
                .unwrap_or(fallback.default_timezone),
        }
    }

    pub fn settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            batch_limit: self.batch_limit,
            window: self.contact_window(),
            running_timeout: Duration::seconds(clamped_secs(self.running_timeout_secs)),
            ..ExecutorSettings::default()
        }
    }
}

impl NotificationsConfig {
    /// The owner's number in E.164, if one is configured and valid.
    pub fn owner_phone(&self) -> Option<String> {
        self.owner_phone.as_deref().and_then(normalize_phone)
    }
}

impl ServerConfig {
    /// Always true when no admin token is configured.
    pub fn admin_token_matches(&self, presented: Option<&str>) -> bool {
        match &self.admin_token {
            None => true,
            Some(expected) => presented.is_some_and(|value| value == expected.expose_secret()),
        }
    }
}

const MAX_DELAY_SECS: u64 = 86_400;
const MAX_NUDGE_QUIET_HOURS: u32 = 24 * 30;

fn clamped_secs(value: u64) -> i64 {
    i64::try_from(value.min(MAX_DELAY_SECS)).unwrap_or(0)
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(admin_token_value) = server.admin_token {
                self.server.admin_token = non_empty_secret(admin_token_value);
            }
        }

        if let Some(planner) = patch.planner {
            if let Some(batch_size) = planner.batch_size {
                self.planner.batch_size = batch_size;
            }
            if let Some(call_delay_secs) = planner.call_delay_secs {
                self.planner.call_delay_secs = call_delay_secs;
            }
            if let Some(nudge_delay_secs) = planner.nudge_delay_secs {
                self.planner.nudge_delay_secs = nudge_delay_secs;
            }
            if let Some(nudge_quiet_hours) = planner.nudge_quiet_hours {
                self.planner.nudge_quiet_hours = nudge_quiet_hours;
            }
            if let Some(office_name) = planner.office_name {
                self.planner.office_name = office_name;
            }
            if let Some(interval_secs) = planner.interval_secs {
                self.planner.interval_secs = interval_secs;
            }
        }

        if let Some(executor) = patch.executor {
            if let Some(batch_limit) = executor.batch_limit {
                self.executor.batch_limit = batch_limit;
            }
            if let Some(interval_secs) = executor.interval_secs {
                self.executor.interval_secs = interval_secs;
            }
            if let Some(start) = executor.contact_window_start_hour {
                self.executor.contact_window_start_hour = start;
            }
            if let Some(end) = executor.contact_window_end_hour {
                self.executor.contact_window_end_hour = end;
            }
            if let Some(default_timezone) = executor.default_timezone {
                self.executor.default_timezone = default_timezone;
            }
            if let Some(running_timeout_secs) = executor.running_timeout_secs {
                self.executor.running_timeout_secs = running_timeout_secs;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(owner_phone) = notifications.owner_phone {
                self.notifications.owner_phone = non_empty(owner_phone);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AGENCYVAULT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AGENCYVAULT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("AGENCYVAULT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("AGENCYVAULT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AGENCYVAULT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AGENCYVAULT_SERVER_PORT") {
            self.server.port = parse_u16("AGENCYVAULT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("AGENCYVAULT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        let admin_token =
            read_env("AGENCYVAULT_SERVER_ADMIN_TOKEN").or_else(|| read_env("AGENCYVAULT_ADMIN_TOKEN"));
        if let Some(value) = admin_token {
            self.server.admin_token = non_empty_secret(value);
        }

        if let Some(value) = read_env("AGENCYVAULT_PLANNER_BATCH_SIZE") {
            self.planner.batch_size = parse_u32("AGENCYVAULT_PLANNER_BATCH_SIZE", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_PLANNER_CALL_DELAY_SECS") {
            self.planner.call_delay_secs = parse_u64("AGENCYVAULT_PLANNER_CALL_DELAY_SECS", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_PLANNER_NUDGE_DELAY_SECS") {
            self.planner.nudge_delay_secs =
                parse_u64("AGENCYVAULT_PLANNER_NUDGE_DELAY_SECS", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_PLANNER_NUDGE_QUIET_HOURS") {
            self.planner.nudge_quiet_hours =
                parse_u32("AGENCYVAULT_PLANNER_NUDGE_QUIET_HOURS", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_PLANNER_OFFICE_NAME") {
            self.planner.office_name = value;
        }
        if let Some(value) = read_env("AGENCYVAULT_PLANNER_INTERVAL_SECS") {
            self.planner.interval_secs = parse_u64("AGENCYVAULT_PLANNER_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_BATCH_LIMIT") {
            self.executor.batch_limit = parse_u32("AGENCYVAULT_EXECUTOR_BATCH_LIMIT", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_INTERVAL_SECS") {
            self.executor.interval_secs = parse_u64("AGENCYVAULT_EXECUTOR_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_START_HOUR") {
            self.executor.contact_window_start_hour =
                parse_u32("AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_START_HOUR", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_END_HOUR") {
            self.executor.contact_window_end_hour =
                parse_u32("AGENCYVAULT_EXECUTOR_CONTACT_WINDOW_END_HOUR", &value)?;
        }
        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_DEFAULT_TIMEZONE") {
            self.executor.default_timezone = value;
        }
        if let Some(value) = read_env("AGENCYVAULT_EXECUTOR_RUNNING_TIMEOUT_SECS") {
            self.executor.running_timeout_secs =
                parse_u64("AGENCYVAULT_EXECUTOR_RUNNING_TIMEOUT_SECS", &value)?;
        }

        let owner_phone = read_env("AGENCYVAULT_NOTIFICATIONS_OWNER_PHONE")
            .or_else(|| read_env("AGENCYVAULT_OWNER_PHONE"));
        if let Some(value) = owner_phone {
            self.notifications.owner_phone = Some(value);
        }

        let log_level =
            read_env("AGENCYVAULT_LOGGING_LEVEL").or_else(|| read_env("AGENCYVAULT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AGENCYVAULT_LOGGING_FORMAT").or_else(|| read_env("AGENCYVAULT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(batch_size) = overrides.planner_batch_size {
            self.planner.batch_size = batch_size;
        }
        if let Some(batch_limit) = overrides.executor_batch_limit {
            self.executor.batch_limit = batch_limit;
        }
        if let Some(admin_token) = overrides.admin_token {
            self.server.admin_token = non_empty_secret(admin_token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_planner(&self.planner)?;
        validate_executor(&self.executor)?;
        validate_notifications(&self.notifications)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn non_empty_secret(value: String) -> Option<SecretString> {
    (!value.trim().is_empty()).then(|| secret_value(value))
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references. Every referenced variable must be set.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after_open[..close];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after_open[close + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_planner(planner: &PlannerConfig) -> Result<(), ConfigError> {
    if planner.batch_size == 0 || planner.batch_size > 500 {
        return Err(ConfigError::Validation(
            "planner.batch_size must be in range 1..=500".to_string(),
        ));
    }

    if planner.call_delay_secs > MAX_DELAY_SECS || planner.nudge_delay_secs > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "planner call/nudge delays must be at most {MAX_DELAY_SECS} seconds"
        )));
    }

    if planner.nudge_quiet_hours > MAX_NUDGE_QUIET_HOURS {
        return Err(ConfigError::Validation(format!(
            "planner.nudge_quiet_hours must be at most {MAX_NUDGE_QUIET_HOURS}"
        )));
    }

    if planner.office_name.trim().is_empty() {
        return Err(ConfigError::Validation("planner.office_name must not be empty".to_string()));
    }

    Ok(())
}

fn validate_executor(executor: &ExecutorConfig) -> Result<(), ConfigError> {
    if executor.batch_limit == 0 || executor.batch_limit > 500 {
        return Err(ConfigError::Validation(
            "executor.batch_limit must be in range 1..=500".to_string(),
        ));
    }

    let start = executor.contact_window_start_hour;
    let end = executor.contact_window_end_hour;
    if start >= end || end > 24 {
        return Err(ConfigError::Validation(format!(
            "executor contact window {start}..{end} is invalid (expected start < end <= 24)"
        )));
    }

    if executor.default_timezone.trim().parse::<Tz>().is_err() {
        return Err(ConfigError::Validation(format!(
            "executor.default_timezone `{}` is not an IANA timezone name",
            executor.default_timezone
        )));
    }

    if executor.running_timeout_secs == 0 || executor.running_timeout_secs > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "executor.running_timeout_secs must be in range 1..={MAX_DELAY_SECS}"
        )));
    }

    Ok(())
}

fn validate_notifications(notifications: &NotificationsConfig) -> Result<(), ConfigError> {
    match notifications.owner_phone.as_deref() {
        Some(raw) if normalize_phone(raw).is_none() => Err(ConfigError::Validation(format!(
            "notifications.owner_phone `{raw}` is not a dialable phone number"
        ))),
        _ => Ok(()),
    }
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    planner: Option<PlannerPatch>,
    executor: Option<ExecutorPatch>,
    notifications: Option<NotificationsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    admin_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlannerPatch {
    batch_size: Option<u32>,
    call_delay_secs: Option<u64>,
    nudge_delay_secs: Option<u64>,
    nudge_quiet_hours: Option<u32>,
    office_name: Option<String>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutorPatch {
    batch_limit: Option<u32>,
    interval_secs: Option<u64>,
    contact_window_start_hour: Option<u32>,
    contact_window_end_hour: Option<u32>,
    default_timezone: Option<String>,
    running_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    owner_phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
