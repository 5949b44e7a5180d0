//! Chat model boundary. The agent loop only sees [`ChatModel`]; the hosted
//! providers are reached through [`ModelClient`].

mod ollama;
mod openai;

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cambist_shared::Tool;
use once_cell::sync::OnceCell;
use reqwest::{Client, Response};

use crate::config::{ModelConfig, ModelSource};
use crate::Message;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { temperature: 0.0 }
    }
}

/// Provider and endpoint details reported on tracing spans.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub provider: String,
    pub model: String,
    pub server_address: Option<String>,
    pub server_port: Option<u16>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn descriptor(&self) -> ModelDescriptor;

    /// One model turn over the full history. The reply is an assistant
    /// message, possibly carrying tool calls.
    async fn complete(&self, messages: &[Message], tools: &[Tool], options: &ChatOptions) -> Result<Message>;
}

pub struct ModelClient {
    config: ModelConfig,
    client: OnceCell<Client>,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        let client = self.client.get_or_try_init(|| {
            Client::builder()
                .user_agent("Cambist/0.1")
                .timeout(REQUEST_TIMEOUT)
                .build()
        })?;
        Ok(client)
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    fn descriptor(&self) -> ModelDescriptor {
        let url = reqwest::Url::parse(&self.config.base_url).ok();

        ModelDescriptor {
            provider: self.config.source.provider_name().to_string(),
            model: self.config.model.clone(),
            server_address: url.as_ref().and_then(|u| u.host_str().map(str::to_string)),
            server_port: url.as_ref().and_then(|u| u.port_or_known_default()),
        }
    }

    async fn complete(&self, messages: &[Message], tools: &[Tool], options: &ChatOptions) -> Result<Message> {
        let client = self.client()?;
        match self.config.source {
            ModelSource::Ollama => ollama::complete(client, &self.config, messages, tools, options).await,
            _ => openai::complete(client, &self.config, messages, tools, options).await,
        }
    }
}

/// Turns a non-2xx response into an error carrying status and a body excerpt.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(300).collect();
    Err(anyhow!("model request failed with {}: {}", status, excerpt))
}
