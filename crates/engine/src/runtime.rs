//! Process-wide agent runtime: the lazily configured model, the tool belts
//! and the session store, shared by every front door.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use cambist_shared::registry;
use cambist_shared::{Tool, Toolbelt};

use crate::config::{ConfigError, ModelConfig};
use crate::error::RunError;
use crate::events::EventSender;
use crate::model::{ChatModel, ModelClient};
use crate::session::SessionStore;
use crate::task::planner::{PlanOutcome, TravelPlanner};
use crate::task::reply::{CurrencyReply, REPLY_FORMAT_INSTRUCTIONS};
use crate::task::scheduler::{ScheduleOutcome, SchedulingAssistant};
use crate::task::toolset::Toolset;
use crate::task::{Agent, CURRENCY_INSTRUCTIONS};
use crate::telemetry::Tracer;

pub type ModelFactory = Box<dyn Fn() -> Result<Arc<dyn ChatModel>, ConfigError> + Send + Sync>;

pub struct AgentRuntime {
    factory: ModelFactory,
    model: OnceCell<Result<Arc<dyn ChatModel>, ConfigError>>,
    tracer: Tracer,
    belts: Vec<Arc<dyn Toolbelt>>,
    sessions: SessionStore,
}

pub const EXCHANGE_TOOL: &str = "get_exchange_rate";

impl AgentRuntime {
    pub fn new(factory: ModelFactory, tracer: Tracer) -> Self {
        Self {
            factory,
            model: OnceCell::new(),
            tracer,
            belts: registry::toolbelts().to_vec(),
            sessions: SessionStore::new(),
        }
    }

    /// Model configured from the process environment on first use.
    pub fn from_env(tracer: Tracer) -> Self {
        Self::new(
            Box::new(|| -> Result<Arc<dyn ChatModel>, ConfigError> {
                let config = ModelConfig::from_env()?;
                info!(source = %config.source, model = %config.model, "Model configured");
                Ok(Arc::new(ModelClient::new(config)) as Arc<dyn ChatModel>)
            }),
            tracer,
        )
    }

    /// Runtime over an already built model.
    pub fn with_model(model: Arc<dyn ChatModel>, tracer: Tracer) -> Self {
        Self::new(Box::new(move || Ok::<_, ConfigError>(model.clone())), tracer)
    }

    /// Replace the registered belt of the same name, e.g. with one pointed
    /// at another exchange API.
    pub fn with_exchange(mut self, belt: Arc<dyn Toolbelt>) -> Self {
        self.belts.retain(|b| b.name() != belt.name());
        self.belts.push(belt);
        self
    }

    /// The model, built once. A configuration error is cached as well.
    pub fn model(&self) -> Result<Arc<dyn ChatModel>, ConfigError> {
        self.model.get_or_init(|| (self.factory)()).clone()
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.model().map(|_| ())
    }

    /// Every tool the registered belts offer.
    pub fn tools(&self) -> Vec<Tool> {
        self.belts.iter().flat_map(|b| b.tools()).collect()
    }

    pub fn currency_agent(&self, events: Option<EventSender>) -> Result<Agent, ConfigError> {
        Ok(Agent::new(
            self.tracer.agent_name(),
            &format!("{}\n\n{}", CURRENCY_INSTRUCTIONS, REPLY_FORMAT_INSTRUCTIONS),
            self.model()?,
            self.tracer.clone(),
        )
        .with_tools(Toolset::single(self.belts.clone(), EXCHANGE_TOOL))
        .with_events(events))
    }

    /// Answer one prompt with the currency agent. With a session id, the
    /// stored history is used and replaced by this run's on success.
    pub async fn run(
        &self,
        prompt: &str,
        session_id: Option<&str>,
        events: Option<EventSender>,
    ) -> Result<CurrencyReply, RunError> {
        let agent = self.currency_agent(events)?;

        let history = session_id.map(|id| self.sessions.history(id)).unwrap_or_default();
        let conversation_id = session_or_new(session_id);

        let run = agent.run(history, prompt, &conversation_id).await.map_err(|e| {
            warn!(session_id = %conversation_id, error = %format!("{:#}", e), "Currency agent run failed");
            RunError::Agent(e)
        })?;

        if let Some(id) = session_id {
            self.sessions.store(id, run.history());
        }
        Ok(CurrencyReply::parse(&run.answer))
    }

    pub async fn plan(&self, request: &str, session_id: Option<&str>) -> Result<PlanOutcome, RunError> {
        let planner = TravelPlanner::new(self.model()?, self.tracer.clone(), self.belts.clone());
        let session_id = session_or_new(session_id);

        Ok(planner.run(request, &session_id).await?)
    }

    /// Hand a meeting request to the scheduling supervisor.
    pub async fn schedule(&self, request: &str, session_id: Option<&str>) -> Result<ScheduleOutcome, RunError> {
        let assistant = SchedulingAssistant::new(self.model()?, self.tracer.clone(), self.belts.clone());
        let session_id = session_or_new(session_id);

        Ok(assistant.run(request, &session_id).await?)
    }
}

fn session_or_new(session_id: Option<&str>) -> String {
    session_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
