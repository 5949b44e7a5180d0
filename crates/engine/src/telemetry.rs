//! Logging setup and the agent tracer.
//!
//! The tracer wraps every agent step in an `invoke_agent` span and every tool
//! call in an `execute_tool` span, carrying the gen_ai semantic attributes.
//! Shipping those spans anywhere is left to whatever subscriber is installed.

use tracing::{debug, info, info_span, Span};

use crate::config::TracerConfig;

pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

/// Who is being invoked, and against which model.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentMetadata {
    pub name: String,
    pub session_id: String,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub server_address: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct Tracer {
    config: TracerConfig,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        if config.connection_string.is_some() {
            info!(service = %config.service_name, "Application Insights connection string configured");
        }
        Self { config }
    }

    /// Name reported for the top-level agent.
    pub fn agent_name(&self) -> &str {
        self.config
            .agent_name
            .as_deref()
            .unwrap_or(&self.config.service_name)
    }

    pub fn agent_id(&self, meta: &AgentMetadata) -> String {
        self.config
            .agent_id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", meta.name, meta.session_id))
    }

    pub fn agent_span(&self, meta: &AgentMetadata) -> Span {
        let provider = self.config.provider_name.as_deref().unwrap_or(&meta.provider);

        info_span!(
            "invoke_agent",
            otel.name = %format!("invoke_agent {}", meta.name),
            gen_ai.operation.name = "invoke_agent",
            gen_ai.agent.name = %meta.name,
            gen_ai.agent.id = %self.agent_id(meta),
            gen_ai.provider.name = %provider,
            gen_ai.request.model = %meta.model,
            gen_ai.request.temperature = meta.temperature as f64,
            gen_ai.conversation.id = %meta.session_id,
            server.address = meta.server_address.as_deref().unwrap_or(""),
            server.port = meta.server_port.unwrap_or(0),
            service.name = %self.config.service_name,
        )
    }

    pub fn tool_span(&self, tool: &str, call_id: Option<&str>) -> Span {
        info_span!(
            "execute_tool",
            otel.name = %format!("execute_tool {}", tool),
            gen_ai.operation.name = "execute_tool",
            gen_ai.tool.name = %tool,
            gen_ai.tool.call.id = call_id.unwrap_or(""),
        )
    }

    /// Logs message content at debug level when content capture is enabled.
    pub fn record_content(&self, kind: &str, content: &str) {
        if self.config.enable_content {
            debug!(kind, content, "gen_ai content");
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(TracerConfig::from_lookup(&|_: &str| -> Option<String> { None }))
    }
}
