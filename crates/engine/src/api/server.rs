use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use super::routes::create_router;
use super::AppState;

pub async fn start_server(state: AppState, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let address = state.config.server.bind_address();
    let a2a_path = super::a2a::rpc_path(&state.config.a2a);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!(%address, a2a = %a2a_path, "Currency agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    Ok(())
}

async fn shutdown_signal(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    info!("Shutting down API server");
}
