use agencyvault_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use agencyvault_db::{connect_with_config, migrations};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(overrides: ConfigOverrides, json_output: bool) -> String {
    let report = build_report(overrides);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(overrides: ConfigOverrides) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_admin_token(&config));
            checks.push(check_contact_window(&config));
            checks.push(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["admin_token", "contact_window", "database_schema"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let failed = checks.iter().any(|check| {
        matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped)
    });
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);

    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: ready with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_admin_token(config: &AppConfig) -> DoctorCheck {
    if config.server.admin_token.is_some() {
        DoctorCheck {
            name: "admin_token",
            status: CheckStatus::Pass,
            details: "mutating HTTP routes require x-admin-token".to_string(),
        }
    } else {
        DoctorCheck {
            name: "admin_token",
            status: CheckStatus::Warn,
            details: "no admin token configured; mutating HTTP routes are open".to_string(),
        }
    }
}

fn check_contact_window(config: &AppConfig) -> DoctorCheck {
    let window = config.executor.contact_window();
    DoctorCheck {
        name: "contact_window",
        status: CheckStatus::Pass,
        details: format!(
            "{:02}:00-{:02}:00 local, default timezone {}",
            window.start_hour, window.end_hour, window.default_timezone
        ),
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_schema",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let pending = migrations::pending_count(&pool).await;
        pool.close().await;
        pending.map_err(|error| format!("failed to read migration state: {error}"))
    });

    match result {
        Ok(0) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Pass,
            details: format!("connected to `{}`; schema up to date", config.database.url),
        },
        Ok(pending) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Warn,
            details: format!("{pending} migration(s) pending; run `agencyvault migrate`"),
        },
        Err(error) => {
            DoctorCheck { name: "database_schema", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
