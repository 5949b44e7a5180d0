use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::warn;

use super::AppState;

pub const API_KEY_HEADER: &str = "api-key";
pub const API_KEY_QUERY: &str = "api_key";
pub const OPEN_PATHS: &[&str] = &["/", "/healthz", "/_ah/health"];

const UNAUTHORIZED: &str =
    "Unauthorized. Supply the correct API key via the api-key header or api_key query parameter.";

fn provided_key(req: &Request) -> Option<String> {
    if let Some(key) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(key.to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(API_KEY_QUERY))
}

/// Enforces `A2A_AGENT_API_KEY` on everything but the open paths. Without
/// a configured key every request passes.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.a2a.api_key.as_deref() else {
        return next.run(req).await;
    };

    if OPEN_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    if provided_key(&req).as_deref() != Some(expected) {
        warn!(path = %req.uri().path(), "Rejected request without a valid API key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": UNAUTHORIZED })),
        )
            .into_response();
    }

    next.run(req).await
}
