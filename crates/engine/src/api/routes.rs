use axum::{
    middleware::from_fn_with_state,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::a2a;
use super::handlers;
use super::middleware::require_api_key;
use super::AppState;

/// Handler answering with a 307 to `target`.
fn redirect_to(target: String) -> impl Fn() -> std::future::Ready<Redirect> + Clone + Send + Sync + 'static {
    move || std::future::ready(Redirect::temporary(&target))
}

pub fn create_router(state: AppState) -> Router {
    let a2a_config = state.config.a2a.clone();
    let card_target = a2a::card_path(&a2a_config);
    let rpc_target = a2a::rpc_path(&a2a_config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::health_check))
        .route("/_ah/health", get(handlers::health_check))
        .route("/invoke", post(handlers::handle_invoke))
        .route("/plan", post(handlers::handle_plan))
        .route("/schedule", post(handlers::handle_schedule))
        .route("/tools", get(handlers::handle_list_tools))
        .nest(&a2a_config.mount_path, a2a::router(&a2a_config))
        // Clients that ignore the mount path
        .route("/.well-known/agent-card.json", get(redirect_to(card_target)))
        .route("/rpc", get(redirect_to(rpc_target.clone())).post(redirect_to(rpc_target)))
        .layer(from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
