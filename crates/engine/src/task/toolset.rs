use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn, Instrument};

use cambist_shared::{Tool, ToolError, Toolbelt};

use crate::telemetry::Tracer;
use crate::ToolCall;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Result of one tool call, as handed back to the model.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    pub payload: String,
}

impl ToolOutcome {
    pub fn success(payload: String) -> Self {
        Self {
            status: ToolStatus::Success,
            payload,
        }
    }

    pub fn error(err: &ToolError) -> Self {
        Self {
            status: ToolStatus::Error,
            payload: format!("Error: {}", err),
        }
    }
}

/// The tools one agent may call. A toolset is either the whole of each
/// belt or a named subset of them.
#[derive(Clone, Default)]
pub struct Toolset {
    belts: Vec<Arc<dyn Toolbelt>>,
    only: Option<Vec<String>>,
}

impl Toolset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(belts: Vec<Arc<dyn Toolbelt>>) -> Self {
        Self { belts, only: None }
    }

    /// Just `tool`, from whichever belt provides it.
    pub fn single(belts: Vec<Arc<dyn Toolbelt>>, tool: &str) -> Self {
        Self::only(belts, &[tool])
    }

    /// The named tools, from whichever belts provide them.
    pub fn only(belts: Vec<Arc<dyn Toolbelt>>, tools: &[&str]) -> Self {
        Self {
            belts,
            only: Some(tools.iter().map(|t| t.to_string()).collect()),
        }
    }

    fn allows(&self, tool: &str) -> bool {
        match &self.only {
            Some(names) => names.iter().any(|n| n == tool),
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools().is_empty()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.belts
            .iter()
            .flat_map(|b| b.tools())
            .filter(|t| self.allows(&t.function.name))
            .collect()
    }

    fn belt_for(&self, tool: &str) -> Option<&Arc<dyn Toolbelt>> {
        if !self.allows(tool) {
            return None;
        }
        self.belts.iter().find(|b| b.has_tool(tool))
    }

    /// Run one call. Recoverable failures come back as an error outcome for
    /// the model; anything else is returned as `Err` and ends the run.
    pub async fn execute(&self, call: &ToolCall, tracer: &Tracer) -> Result<ToolOutcome> {
        let name = call.function.name.as_str();
        let span = tracer.tool_span(name, call.id.as_deref());

        async {
            let Some(belt) = self.belt_for(name) else {
                warn!(tool = name, "Model requested an unavailable tool");
                return Ok(ToolOutcome::error(&ToolError::NotFound(name.to_string())));
            };

            info!(tool = name, args = %call.function.arguments, "Calling tool");
            match belt.call(name, &call.function.arguments).await {
                Ok(payload) => Ok(ToolOutcome::success(payload)),
                Err(e) => match e.downcast_ref::<ToolError>() {
                    Some(tool_err) => {
                        warn!(tool = name, error = %tool_err, "Tool rejected the call");
                        Ok(ToolOutcome::error(tool_err))
                    }
                    None => Err(e),
                },
            }
        }
        .instrument(span)
        .await
    }
}
