use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use cambist_engine::api::{self, AppState};
use cambist_engine::config::Config;
use cambist_engine::runtime::AgentRuntime;
use cambist_engine::telemetry::{init_logging, Tracer};

/// Currency exchange agent server
#[derive(Parser, Debug)]
#[command(name = "cambist", version, about)]
struct Cli {
    /// Interface to bind (default: BIND_HOST, HOST or 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (default: PORT or 8080)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(cli: Cli) -> Result<()> {
    let config = Config::from_env(cli.host, cli.port)?;
    let runtime = Arc::new(AgentRuntime::from_env(Tracer::new(config.tracer.clone())));

    // Fail before binding when the model cannot be configured
    runtime.check()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState::new(runtime, config);
    let mut api_handle = tokio::spawn(api::start_server(state, shutdown_rx));

    let server_exited = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received shutdown signal");
            false
        }
        // A bind failure ends the server without a signal
        result = &mut api_handle => {
            result??;
            true
        }
    };

    if !server_exited {
        let _ = shutdown_tx.send(true);
        api_handle.await??;
    }

    info!("Shutdown complete");
    Ok(())
}
