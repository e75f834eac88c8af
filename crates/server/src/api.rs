use std::sync::Arc;

use agencyvault_core::config::AppConfig;
use agencyvault_core::errors::{ApplicationError, InterfaceError};
use agencyvault_core::outreach::inbound::InboundReport;
use agencyvault_core::{
    call_now, create_lead, handle_inbound_text, remove_lead, report_outcome, review_lead,
    text_now, Action, ActionId, DecisionReport, ExecutionReport, HumanOutcome, Lead, LeadId,
    LeadMemoryEntry, Message, NewLead, OutboundChannel, OutreachExecutor, OutreachPlanner,
    OutreachStore, OwnerNotifier, PlanReport,
};
use agencyvault_db::SqlOutreachStore;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::health;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqlOutreachStore>,
    pub config: Arc<AppConfig>,
    pub channel: Arc<dyn OutboundChannel>,
}

impl AppState {
    pub fn planner(&self, batch_size: Option<u32>) -> OutreachPlanner {
        let mut settings = self.config.planner.settings();
        if let Some(batch_size) = batch_size.filter(|size| *size > 0) {
            settings.batch_size = batch_size;
        }
        OutreachPlanner::new(settings)
    }

    pub fn executor(&self, limit: Option<u32>) -> OutreachExecutor {
        let mut settings = self.config.executor.settings();
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            settings.batch_limit = limit;
        }
        OutreachExecutor::new(Arc::clone(&self.channel), settings)
    }

    /// Owner alerts go out through the same channel as lead outreach.
    pub fn notifier(&self) -> OwnerNotifier {
        OwnerNotifier::new(Arc::clone(&self.channel), self.config.notifications.owner_phone())
    }
}

pub fn router(state: AppState) -> Router {
    let store = Arc::clone(&state.store);

    Router::new()
        .route("/leads", post(create_lead_handler))
        .route("/leads/{lead_id}", get(get_lead).delete(delete_lead))
        .route("/leads/{lead_id}/messages", get(lead_messages))
        .route("/leads/{lead_id}/text-now", post(text_lead_now))
        .route("/leads/{lead_id}/call-now", post(call_lead_now))
        .route("/leads/{lead_id}/decision", get(preview_decision))
        .route("/leads/{lead_id}/decision/apply", post(apply_decision))
        .route("/ai/plan", post(run_planner))
        .route("/worker/execute", post(run_executor))
        .route("/actions/{action_id}/report", post(report_action_outcome))
        .route("/inbound/sms", post(inbound_sms))
        .with_state(state)
        .merge(health::router(store))
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    detail: String,
    correlation_id: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id(),
        };
        (status, Json(body)).into_response()
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple()))
}

fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
    correlation_id: &str,
) -> Result<(), ApiError> {
    let presented = headers.get(ADMIN_TOKEN_HEADER).and_then(|value| value.to_str().ok());
    if state.config.server.admin_token_matches(presented.map(str::trim)) {
        return Ok(());
    }

    warn!(
        event_name = "api.auth.rejected",
        correlation_id,
        token_present = presented.is_some(),
        "admin token missing or invalid"
    );
    Err(ApiError(InterfaceError::Unauthorized {
        message: if presented.is_some() {
            "invalid admin token".to_string()
        } else {
            "missing admin token".to_string()
        },
        correlation_id: correlation_id.to_string(),
    }))
}

fn map_error(correlation_id: &str) -> impl FnOnce(ApplicationError) -> ApiError + '_ {
    move |error| {
        warn!(event_name = "api.request.failed", correlation_id, error = %error, "request failed");
        ApiError(error.into_interface(correlation_id))
    }
}

async fn create_lead_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewLead>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    let lead = create_lead(state.store.as_ref(), input, Utc::now())
        .await
        .map_err(map_error(&correlation_id))?;
    info!(
        event_name = "api.lead.created",
        correlation_id = %correlation_id,
        lead_id = %lead.id,
        "lead created"
    );
    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Serialize)]
pub struct LeadView {
    pub lead: Lead,
    pub actions: Vec<Action>,
    pub memory: Vec<LeadMemoryEntry>,
}

async fn get_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadView>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let lead_id = LeadId(lead_id);
    let errors = map_error(&correlation_id);

    let lookup: Result<LeadView, ApplicationError> = async {
        let lead = state
            .store
            .find_lead(&lead_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound {
                entity: "lead",
                id: lead_id.to_string(),
            })?;
        let actions = state.store.actions_for_lead(&lead_id).await?;
        let memory = state.store.memory_for_lead(&lead_id).await?;
        Ok(LeadView { lead, actions, memory })
    }
    .await;

    lookup.map(Json).map_err(errors)
}

async fn delete_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    let removed = remove_lead(state.store.as_ref(), &LeadId(lead_id), Utc::now())
        .await
        .map_err(map_error(&correlation_id))?;
    info!(
        event_name = "api.lead.deleted",
        correlation_id = %correlation_id,
        lead_id = %removed.id,
        "lead deleted"
    );
    Ok(Json(removed))
}

async fn lead_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let lead_id = LeadId(lead_id);

    let lookup: Result<Vec<Message>, ApplicationError> = async {
        if state.store.find_lead(&lead_id).await?.is_none() {
            return Err(ApplicationError::NotFound { entity: "lead", id: lead_id.to_string() });
        }
        state.store.messages_for_lead(&lead_id).await
    }
    .await;

    lookup.map(Json).map_err(map_error(&correlation_id))
}

async fn text_lead_now(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<Action>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    text_now(
        state.store.as_ref(),
        state.channel.as_ref(),
        &LeadId(lead_id),
        &state.config.planner.office_name,
        Utc::now(),
    )
    .await
    .map(Json)
    .map_err(map_error(&correlation_id))
}

async fn call_lead_now(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<Action>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    call_now(state.store.as_ref(), state.channel.as_ref(), &LeadId(lead_id), Utc::now())
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}

async fn preview_decision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<DecisionReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    review_lead(state.store.as_ref(), &LeadId(lead_id), false, Utc::now())
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}

async fn apply_decision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<DecisionReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    review_lead(state.store.as_ref(), &LeadId(lead_id), true, Utc::now())
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanParams {
    pub batch_size: Option<u32>,
}

async fn run_planner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PlanParams>,
) -> Result<Json<PlanReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    state
        .planner(params.batch_size)
        .plan_actions(state.store.as_ref(), Utc::now())
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteParams {
    pub limit: Option<u32>,
}

async fn run_executor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ExecuteParams>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    state
        .executor(params.limit)
        .execute_due(state.store.as_ref(), Utc::now())
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub outcome: HumanOutcome,
    #[serde(default)]
    pub note: Option<String>,
}

async fn report_action_outcome(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(action_id): Path<String>,
    Json(request): Json<OutcomeRequest>,
) -> Result<Json<Action>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    report_outcome(
        state.store.as_ref(),
        &ActionId(action_id),
        request.outcome,
        request.note.as_deref(),
        Utc::now(),
    )
    .await
    .map(Json)
    .map_err(map_error(&correlation_id))
}

#[derive(Debug, Deserialize)]
pub struct InboundSms {
    pub from: String,
    pub body: String,
}

async fn inbound_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<InboundSms>,
) -> Result<Json<InboundReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    require_admin(&state, &headers, &correlation_id)?;

    handle_inbound_text(
        state.store.as_ref(),
        &state.notifier(),
        &message.from,
        &message.body,
        Utc::now(),
    )
        .await
        .map(Json)
        .map_err(map_error(&correlation_id))
}
