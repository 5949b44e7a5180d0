use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

use cambist_shared::Tool;

use super::types::*;
use super::AppState;
use crate::error::RunError;
use crate::task::planner::PlanOutcome;
use crate::task::scheduler::ScheduleOutcome;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!(
            "Currency exchange agent. POST /invoke with {{\"prompt\": \"...\"}}, \
             POST /plan for a travel itinerary, POST /schedule to book a meeting, \
             or use the A2A endpoint at {}.",
            super::a2a::rpc_path(&state.config.a2a)
        ),
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, RunError> {
    state.runtime.check()?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

pub async fn handle_invoke(
    State(state): State<AppState>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, RunError> {
    validate_prompt(&req.prompt).map_err(RunError::InvalidRequest)?;
    info!(session_id = ?req.session_id, "Invoke request");

    let reply = state
        .runtime
        .run(&req.prompt, req.session_id.as_deref(), None)
        .await?;

    Ok(Json(InvokeResponse { result: reply.message }))
}

pub async fn handle_plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanOutcome>, RunError> {
    validate_prompt(&req.prompt).map_err(RunError::InvalidRequest)?;
    info!(session_id = ?req.session_id, "Plan request");

    let outcome = state.runtime.plan(&req.prompt, req.session_id.as_deref()).await?;

    Ok(Json(outcome))
}

pub async fn handle_schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleOutcome>, RunError> {
    validate_prompt(&req.prompt).map_err(RunError::InvalidRequest)?;
    info!(session_id = ?req.session_id, "Schedule request");

    let outcome = state.runtime.schedule(&req.prompt, req.session_id.as_deref()).await?;

    Ok(Json(outcome))
}

pub async fn handle_list_tools(State(state): State<AppState>) -> Json<Vec<Tool>> {
    Json(state.runtime.tools())
}
