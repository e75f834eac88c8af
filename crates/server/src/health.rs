use std::sync::Arc;

use agencyvault_core::domain::run::{AgentRun, RunMode, RunStatus};
use agencyvault_db::{RepositoryError, SqlOutreachStore};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<SqlOutreachStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkerCheck {
    /// `idle` before the first run, then the last run's state: `running`, `ready` or
    /// `failing`.
    pub status: &'static str,
    pub last_run_id: Option<String>,
    pub last_started_at: Option<String>,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub planner: WorkerCheck,
    pub executor: WorkerCheck,
    /// PENDING TEXT/CALL actions waiting for the executor.
    pub pending_actions: Option<i64>,
    pub checked_at: String,
}

pub fn router(store: Arc<SqlOutreachStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

/// 503 only when the database is unreachable. A failing worker degrades the payload
/// status but keeps the endpoint up so the failure detail stays readable.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.store).await;
    if database.status != "ready" {
        let unknown = || WorkerCheck {
            status: "unknown",
            last_run_id: None,
            last_started_at: None,
            detail: "database unreachable".to_string(),
        };
        let payload = HealthResponse {
            status: "degraded",
            database,
            planner: unknown(),
            executor: unknown(),
            pending_actions: None,
            checked_at: Utc::now().to_rfc3339(),
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(payload));
    }

    let planner = worker_check(state.store.latest_run(RunMode::Planning).await);
    let executor = worker_check(state.store.latest_run(RunMode::Execution).await);
    let pending_actions = state.store.pending_outbound_count().await.ok();
    let degraded = [&planner, &executor].iter().any(|check| check.status == "failing");

    let payload = HealthResponse {
        status: if degraded { "degraded" } else { "ready" },
        database,
        planner,
        executor,
        pending_actions,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}

async fn database_check(store: &SqlOutreachStore) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(store.pool()).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn worker_check(latest: Result<Option<AgentRun>, RepositoryError>) -> WorkerCheck {
    match latest {
        Ok(None) => WorkerCheck {
            status: "idle",
            last_run_id: None,
            last_started_at: None,
            detail: "no runs recorded".to_string(),
        },
        Ok(Some(run)) => WorkerCheck {
            status: match run.status {
                RunStatus::Started => "running",
                RunStatus::Succeeded => "ready",
                RunStatus::Failed => "failing",
            },
            last_run_id: Some(run.id.0.clone()),
            last_started_at: Some(run.started_at.to_rfc3339()),
            detail: run.notes,
        },
        Err(error) => WorkerCheck {
            status: "unknown",
            last_run_id: None,
            last_started_at: None,
            detail: format!("run lookup failed: {error}"),
        },
    }
}
