pub mod chain;
pub mod planner;
pub mod reply;
pub mod router;
pub mod scheduler;
pub mod toolset;

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, Instrument};

use crate::events::EventSender;
use crate::model::{ChatModel, ChatOptions};
use crate::telemetry::{AgentMetadata, Tracer};
use crate::Message;
use router::{LoopState, Phase};
use toolset::Toolset;

/// Model invocations allowed per run before it is abandoned.
pub const MAX_MODEL_CALLS: usize = 25;

pub const CURRENCY_INSTRUCTIONS: &str = "You are a helpful assistant that only answers questions about \
     currency exchange rates. Always choose the get_exchange_rate tool when you need fresh FX data. \
     Decline unrelated requests politely.";

/// One tool-augmented model, bound to its instructions and tools.
/// Agents are cheap; build a fresh one per step.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    model: Arc<dyn ChatModel>,
    toolset: Toolset,
    options: ChatOptions,
    tracer: Tracer,
    events: Option<EventSender>,
    max_model_calls: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    /// Full conversation, system prompt first.
    pub messages: Vec<Message>,
    pub phases: Vec<Phase>,
}

impl AgentRun {
    pub fn model_calls(&self) -> usize {
        self.phases.iter().filter(|p| **p == Phase::Model).count()
    }

    /// The conversation without the system prompt, for session storage.
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.role != crate::Role::System)
            .cloned()
            .collect()
    }
}

impl Agent {
    pub fn new(name: &str, instructions: &str, model: Arc<dyn ChatModel>, tracer: Tracer) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            model,
            toolset: Toolset::empty(),
            options: ChatOptions::default(),
            tracer,
            events: None,
            max_model_calls: MAX_MODEL_CALLS,
        }
    }

    pub fn with_tools(mut self, toolset: Toolset) -> Self {
        self.toolset = toolset;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_model_calls(mut self, max: usize) -> Self {
        self.max_model_calls = max;
        self
    }

    fn metadata(&self, session_id: &str) -> AgentMetadata {
        let descriptor = self.model.descriptor();
        AgentMetadata {
            name: self.name.clone(),
            session_id: session_id.to_string(),
            provider: descriptor.provider,
            model: descriptor.model,
            temperature: self.options.temperature,
            server_address: descriptor.server_address,
            server_port: descriptor.server_port,
        }
    }

    /// Answer `prompt` after `history`, looping model and tool phases until
    /// the model replies without tool calls.
    pub async fn run(&self, history: Vec<Message>, prompt: &str, session_id: &str) -> Result<AgentRun> {
        let span = self.tracer.agent_span(&self.metadata(session_id));
        self.run_loop(history, prompt).instrument(span).await
    }

    async fn run_loop(&self, history: Vec<Message>, prompt: &str) -> Result<AgentRun> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.instructions.clone()));
        messages.extend(history);
        messages.push(Message::user(prompt));
        self.tracer.record_content("input", prompt);

        let tools = self.toolset.tools();
        let mut phases = Vec::new();
        let mut model_calls = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if model_calls >= self.max_model_calls {
                        bail!(
                            "agent '{}' reached the limit of {} model calls without finishing",
                            self.name,
                            self.max_model_calls
                        );
                    }
                    model_calls += 1;

                    let reply = self.model.complete(&messages, &tools, &self.options).await?;
                    debug!(agent = %self.name, tool_calls = reply.requested_tools().len(), "Model replied");
                    phases.push(Phase::Model);

                    let next = router::after_model(&reply);
                    messages.push(reply);
                    next
                }
                LoopState::AwaitingTool(calls) => {
                    for call in &calls {
                        let name = call.function.name.as_str();
                        if let Some(events) = &self.events {
                            events.tool_call(&self.name, name, call.function.arguments.clone());
                        }

                        let outcome = self.toolset.execute(call, &self.tracer).await?;

                        if let Some(events) = &self.events {
                            events.tool_result(&self.name, name, &outcome.payload);
                        }
                        self.tracer.record_content("tool_result", &outcome.payload);
                        messages.push(Message::tool(call, outcome.payload));
                    }
                    phases.push(Phase::Tool);
                    router::after_tools()
                }
                LoopState::Done(answer) => {
                    info!(agent = %self.name, model_calls, "Agent finished");
                    self.tracer.record_content("output", &answer);
                    return Ok(AgentRun {
                        answer,
                        messages,
                        phases,
                    });
                }
            };
        }
    }
}
