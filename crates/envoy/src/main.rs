mod client;
mod config;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;
use config::Config;

/// Envoy - client for the Cambist currency agent
#[derive(Parser, Debug)]
#[command(name = "envoy", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question over /invoke
    Ask {
        prompt: String,
        /// Reuse the conversation stored under this id
        #[arg(long)]
        session: Option<String>,
    },
    /// Interactive chat over A2A streaming
    Chat,
    /// Plan a trip with the travel specialists
    Plan { prompt: String },
    /// Book a meeting and send the follow-up through the scheduling supervisor
    Schedule { prompt: String },
    /// Show the agent card
    Card,
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Set {
        #[command(subcommand)]
        field: ConfigField,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigField {
    /// Server base URL
    Server { url: String },
    /// Key sent in the api-key header
    ApiKey { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return Err(e);
        }
    };

    let client = ApiClient::new(config.server_url.clone(), config.api_key.clone());

    // Default to chat if no command
    let result = match cli.command.unwrap_or(Command::Chat) {
        Command::Ask { prompt, session } => ui::ask(client, &prompt, session.as_deref()).await,
        Command::Chat => ui::interactive_chat(client).await,
        Command::Plan { prompt } => ui::plan(client, &prompt).await,
        Command::Schedule { prompt } => ui::schedule(client, &prompt).await,
        Command::Card => ui::card(client).await,
        Command::Config { action: None } => {
            println!("Current config:");
            println!("  Server URL: {}", config.server_url);
            println!("  API key: {}", config.masked_api_key());
            Ok(())
        }
        Command::Config {
            action: Some(ConfigAction::Set { field }),
        } => match field {
            ConfigField::Server { url } => {
                config.set_server(&url)?;
                println!("Server URL updated to: {}", config.server_url);
                Ok(())
            }
            ConfigField::ApiKey { key } => {
                config.set_api_key(&key)?;
                println!("API key updated: {}", config.masked_api_key());
                Ok(())
            }
        },
    };

    if let Err(e) = &result {
        eprintln!("Failed to reach the agent at {}: {}", config.server_url, e);
    }
    result
}
