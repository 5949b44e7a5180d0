//! Scheduling assistant: a supervisor agent whose two tools delegate to a
//! nested calendar chain and to an email agent.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use cambist_shared::schemas::{required_str, ParameterSchema, ToolError, ToolSchema, Toolbelt};

use super::chain::{define_steps, START};
use super::toolset::Toolset;
use super::Agent;
use crate::model::ChatModel;
use crate::telemetry::Tracer;

pub const SUPERVISOR: &str = "supervisor_agent";
pub const SUPERVISOR_TEMPERATURE: f32 = 0.3;
pub const SUPERVISOR_INSTRUCTIONS: &str = "You are a senior assistant coordinating meetings and \
     email follow-ups. Use the available tools to schedule events and send summaries.";

pub const EMAIL_AGENT: &str = "email_agent";
pub const EMAIL_TEMPERATURE: f32 = 0.2;
pub const EMAIL_INSTRUCTIONS: &str = "You are an email assistant. Compose professional summaries \
     and send email updates using the send_email tool.";

pub const NO_CALENDAR_OUTPUT: &str = "No calendar output";
pub const NO_SCHEDULE: &str = "No schedule produced.";

define_steps! {
    ScheduleStep {
        CalendarPlanner {
            name: "calendar_planner",
            agent: "calendar_agent",
            description: "Calendar scheduling sub-agent",
            temperature: 0.2,
            tools: ["create_calendar_event", "get_available_time_slots"],
            captures: "calendar_details",
            instructions: "You are a calendar scheduling assistant. Always convert requests into \
                           explicit ISO datetime values. Use get_available_time_slots before \
                           creating events.",
            next: [EmailFollowup],
        },
        EmailFollowup {
            name: "email_followup",
            agent: "note_agent",
            description: "Note refinement agent",
            temperature: 0.3,
            tools: [],
            captures: "schedule_response",
            instructions: "You refine planning notes into conversational updates. Keep replies \
                           concise and clear.",
            next: [],
        },
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub request: String,
    pub session_id: String,
    pub calendar_details: Option<String>,
    pub schedule_response: Option<String>,
    pub current_step: String,
}

impl ScheduleState {
    pub fn new(request: &str, session_id: &str) -> Self {
        Self {
            request: request.to_string(),
            session_id: session_id.to_string(),
            calendar_details: None,
            schedule_response: None,
            current_step: START.to_string(),
        }
    }

    fn capture(&mut self, step: ScheduleStep, answer: &str) {
        match step.captures() {
            Some("calendar_details") => self.calendar_details = Some(answer.to_string()),
            Some("schedule_response") => self.schedule_response = Some(answer.to_string()),
            _ => {}
        }
    }
}

pub fn schedule_prompt(step: ScheduleStep, state: &ScheduleState) -> String {
    match step {
        ScheduleStep::CalendarPlanner => format!("Please schedule this request: {}", state.request),
        ScheduleStep::EmailFollowup => format!(
            "Create a concise update for stakeholders summarizing the scheduled meeting.\n\
             Scheduling request: {}\n\
             Calendar summary: {}",
            state.request,
            state.calendar_details.as_deref().unwrap_or(NO_CALENDAR_OUTPUT)
        ),
    }
}

/// The calendar planner followed by the note agent's stakeholder update.
pub struct CalendarFlow {
    model: Arc<dyn ChatModel>,
    tracer: Tracer,
    belts: Vec<Arc<dyn Toolbelt>>,
}

impl CalendarFlow {
    pub fn new(model: Arc<dyn ChatModel>, tracer: Tracer, belts: Vec<Arc<dyn Toolbelt>>) -> Self {
        Self { model, tracer, belts }
    }

    pub async fn run_from(&self, mut state: ScheduleState) -> Result<ScheduleState> {
        while let Some(step) = ScheduleStep::route(&state.current_step) {
            info!(step = step.name(), agent = step.agent(), session_id = %state.session_id, "Running schedule step");

            let agent = Agent::new(step.agent(), step.instructions(), self.model.clone(), self.tracer.clone())
                .with_tools(Toolset::only(self.belts.clone(), step.tools()))
                .with_temperature(step.temperature());
            let run = agent
                .run(Vec::new(), &schedule_prompt(step, &state), &state.session_id)
                .await
                .with_context(|| format!("schedule step '{}' failed", step.name()))?;

            state.capture(step, &run.answer);
            state.current_step = step.successor_name().to_string();
        }
        Ok(state)
    }
}

static DELEGATION_SCHEMAS: Lazy<Vec<ToolSchema>> = Lazy::new(|| {
    let request = |description: &'static str| ParameterSchema {
        name: "request",
        type_name: "string",
        description,
        required: true,
        default: None,
    };
    vec![
        ToolSchema {
            name: "schedule_event",
            toolbelt: "Delegation",
            description: "Delegate scheduling requests to the calendar workflow.",
            parameters: vec![request("What to schedule, with attendees and timing")],
        },
        ToolSchema {
            name: "manage_email",
            toolbelt: "Delegation",
            description: "Send follow-up emails via the email agent.",
            parameters: vec![request("Who to email and what the message should cover")],
        },
    ]
});

/// The supervisor's tools. Each call runs nested agents in the same session.
pub struct Delegation {
    model: Arc<dyn ChatModel>,
    tracer: Tracer,
    belts: Vec<Arc<dyn Toolbelt>>,
    session_id: String,
}

impl Delegation {
    pub fn new(model: Arc<dyn ChatModel>, tracer: Tracer, belts: Vec<Arc<dyn Toolbelt>>, session_id: &str) -> Self {
        Self {
            model,
            tracer,
            belts,
            session_id: session_id.to_string(),
        }
    }

    async fn schedule_event(&self, args: &Value) -> Result<String> {
        let request = required_str(args, "request")?;
        let flow = CalendarFlow::new(self.model.clone(), self.tracer.clone(), self.belts.clone());
        let state = flow.run_from(ScheduleState::new(request, &self.session_id)).await?;
        Ok(state.schedule_response.unwrap_or_else(|| NO_SCHEDULE.to_string()))
    }

    async fn manage_email(&self, args: &Value) -> Result<String> {
        let request = required_str(args, "request")?;
        let agent = Agent::new(EMAIL_AGENT, EMAIL_INSTRUCTIONS, self.model.clone(), self.tracer.clone())
            .with_tools(Toolset::single(self.belts.clone(), "send_email"))
            .with_temperature(EMAIL_TEMPERATURE);
        Ok(agent.run(Vec::new(), request, &self.session_id).await?.answer)
    }
}

#[async_trait]
impl Toolbelt for Delegation {
    fn name(&self) -> &'static str {
        "Delegation"
    }

    fn description(&self) -> &'static str {
        "Calendar workflow and email agent behind the supervisor"
    }

    fn schemas(&self) -> &[ToolSchema] {
        &DELEGATION_SCHEMAS
    }

    async fn call(&self, tool: &str, args: &Value) -> Result<String> {
        match tool {
            "schedule_event" => self.schedule_event(args).await,
            "manage_email" => self.manage_email(args).await,
            other => Err(ToolError::NotFound(other.to_string()).into()),
        }
    }
}

/// Result of one scheduling request.
#[derive(Serialize, Debug, Clone)]
pub struct ScheduleOutcome {
    pub result: String,
    pub session_id: String,
    /// Supervisor tool calls, in order.
    pub delegations: Vec<String>,
}

pub struct SchedulingAssistant {
    model: Arc<dyn ChatModel>,
    tracer: Tracer,
    belts: Vec<Arc<dyn Toolbelt>>,
}

impl SchedulingAssistant {
    pub fn new(model: Arc<dyn ChatModel>, tracer: Tracer, belts: Vec<Arc<dyn Toolbelt>>) -> Self {
        Self { model, tracer, belts }
    }

    pub async fn run(&self, request: &str, session_id: &str) -> Result<ScheduleOutcome> {
        let delegation = Delegation::new(self.model.clone(), self.tracer.clone(), self.belts.clone(), session_id);
        let supervisor = Agent::new(SUPERVISOR, SUPERVISOR_INSTRUCTIONS, self.model.clone(), self.tracer.clone())
            .with_tools(Toolset::new(vec![Arc::new(delegation) as Arc<dyn Toolbelt>]))
            .with_temperature(SUPERVISOR_TEMPERATURE);

        let run = supervisor.run(Vec::new(), request, session_id).await?;
        let delegations = run
            .messages
            .iter()
            .flat_map(|m| m.requested_tools())
            .map(|call| call.function.name.clone())
            .collect();

        Ok(ScheduleOutcome {
            result: run.answer,
            session_id: session_id.to_string(),
            delegations,
        })
    }
}
