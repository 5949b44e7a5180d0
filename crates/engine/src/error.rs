use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;

pub const AGENT_FAILED: &str = "Agent execution failed.";

/// Failure of one agent or planner run, as seen by the HTTP handlers.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model could not be configured; the message names the variables.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Model, tool or loop failure. Details are logged, never returned.
    #[error("agent execution failed: {0:#}")]
    Agent(#[from] anyhow::Error),
}

impl IntoResponse for RunError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            RunError::Config(e) => {
                error!(error = %e, "model configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            RunError::InvalidRequest(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            RunError::Agent(e) => {
                error!(error = %format!("{:#}", e), "agent execution failed");
                (StatusCode::INTERNAL_SERVER_ERROR, AGENT_FAILED.to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
