//! Travel planner: the fixed specialist chain from [`super::chain`] run
//! over a shared [`PlannerState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use cambist_shared::schemas::{required_str, ParameterSchema, ToolError, ToolSchema, Toolbelt};
use cambist_shared::toolbelts::travel::{pick_destination, pick_origin};

use super::chain::{Step, START};
use super::toolset::Toolset;
use super::Agent;
use crate::model::ChatModel;
use crate::telemetry::Tracer;
use crate::Message;

pub const TRAVELLERS: u32 = 2;
pub const LEAD_DAYS: u64 = 21;
pub const TRIP_NIGHTS: u64 = 5;

#[derive(Debug, Clone)]
pub struct PlannerState {
    pub request: String,
    pub session_id: String,
    pub origin: String,
    pub destination: String,
    pub departure: String,
    pub return_date: String,
    pub travellers: u32,
    pub summaries: BTreeMap<&'static str, String>,
    pub final_itinerary: Option<String>,
    pub messages: Vec<Message>,
    pub current_step: String,
}

impl PlannerState {
    pub fn new(request: &str, session_id: &str, today: NaiveDate) -> Self {
        let departure = today.checked_add_days(Days::new(LEAD_DAYS)).unwrap_or(today);
        let return_date = departure
            .checked_add_days(Days::new(TRIP_NIGHTS))
            .unwrap_or(departure);

        Self {
            request: request.to_string(),
            session_id: session_id.to_string(),
            origin: pick_origin(request),
            destination: pick_destination(request),
            departure: departure.format("%Y-%m-%d").to_string(),
            return_date: return_date.format("%Y-%m-%d").to_string(),
            travellers: TRAVELLERS,
            summaries: BTreeMap::new(),
            final_itinerary: None,
            messages: vec![Message::user(request)],
            current_step: START.to_string(),
        }
    }

    fn summary(&self, key: &str) -> Option<&str> {
        self.summaries.get(key).map(String::as_str)
    }

    /// Specialist findings handed to the synthesizer and the editor.
    pub fn summary_payload(&self) -> Value {
        json!({
            "flight": self.summary("flight_summary"),
            "hotel": self.summary("hotel_summary"),
            "activities": self.summary("activities_summary"),
            "dining": self.summary("dining_summary"),
        })
    }

    fn capture(&mut self, step: Step, answer: &str) {
        self.messages.push(Message::assistant(answer));
        match step.captures() {
            Some("final_itinerary") => self.final_itinerary = Some(answer.to_string()),
            Some(key) => {
                self.summaries.insert(key, answer.to_string());
            }
            None => {}
        }
    }
}

/// The user turn each step is given.
pub fn task_prompt(step: Step, state: &PlannerState) -> String {
    match step {
        Step::Coordinator => state.request.clone(),
        Step::FlightSpecialist => format!(
            "Find an appealing flight from {} to {} departing {} for {} travellers.",
            state.origin, state.destination, state.departure, state.travellers
        ),
        Step::HotelSpecialist => format!(
            "Recommend a boutique hotel in {} between {} and {} for {} travellers.",
            state.destination, state.departure, state.return_date, state.travellers
        ),
        Step::ActivitySpecialist => format!(
            "Curate signature activities for travellers spending a week in {}.",
            state.destination
        ),
        Step::DiningSpecialist => format!(
            "Recommend dining highlights for a week-long stay in {}.",
            state.destination
        ),
        Step::PlanSynthesizer => format!(
            "Steps:\n\
             1. Draft a detailed itinerary using the information provided.\n\
             2. Call the tool `polish_itinerary` exactly once with the full draft text.\n\
             3. Output only the polished itinerary returned by the tool.\n\n\
             Traveller request:\n{}\n\n\
             Origin: {} | Destination: {}\n\
             Dates: {} to {}\n\n\
             Specialist summaries:\n{}",
            state.request,
            state.origin,
            state.destination,
            state.departure,
            state.return_date,
            serde_json::to_string_pretty(&state.summary_payload()).unwrap_or_default()
        ),
    }
}

static EDITOR_SCHEMAS: Lazy<Vec<ToolSchema>> = Lazy::new(|| {
    vec![ToolSchema {
        name: "polish_itinerary",
        toolbelt: "ItineraryEditor",
        description: "Use to refine the itinerary before returning it to the traveller. \
                      Provide the full itinerary text via the 'draft' argument.",
        parameters: vec![ParameterSchema {
            name: "draft",
            type_name: "string",
            description: "Full itinerary draft",
            required: true,
            default: None,
        }],
    }]
});

/// `polish_itinerary`: hands the draft plus the specialist summaries to a
/// nested, tool-less `itinerary_editor` agent.
pub struct ItineraryEditor {
    model: Arc<dyn ChatModel>,
    tracer: Tracer,
    session_id: String,
    summaries: Value,
}

impl ItineraryEditor {
    pub const TEMPERATURE: f32 = 0.2;

    pub fn new(model: Arc<dyn ChatModel>, tracer: Tracer, session_id: &str, summaries: Value) -> Self {
        Self {
            model,
            tracer,
            session_id: session_id.to_string(),
            summaries,
        }
    }

    async fn polish_itinerary(&self, args: &Value) -> Result<String> {
        let draft = required_str(args, "draft")?;

        let mut payload = self.summaries.clone();
        payload["draft"] = json!(draft);
        let prompt = format!("Refine this travel plan:\n{}", serde_json::to_string_pretty(&payload)?);

        let editor = Agent::new(
            "itinerary_editor",
            "You polish travel itineraries. Keep every concrete detail and return only the itinerary.",
            self.model.clone(),
            self.tracer.clone(),
        )
        .with_temperature(Self::TEMPERATURE);

        Ok(editor.run(Vec::new(), &prompt, &self.session_id).await?.answer)
    }
}

#[async_trait]
impl Toolbelt for ItineraryEditor {
    fn name(&self) -> &'static str {
        "ItineraryEditor"
    }

    fn description(&self) -> &'static str {
        "Nested editor agent for itinerary drafts"
    }

    fn schemas(&self) -> &[ToolSchema] {
        &EDITOR_SCHEMAS
    }

    async fn call(&self, tool: &str, args: &Value) -> Result<String> {
        match tool {
            "polish_itinerary" => self.polish_itinerary(args).await,
            other => Err(ToolError::NotFound(other.to_string()).into()),
        }
    }
}

/// Result of a full planner run.
#[derive(Serialize, Debug, Clone)]
pub struct PlanOutcome {
    pub result: String,
    pub session_id: String,
    pub origin: String,
    pub destination: String,
    pub departure: String,
    pub return_date: String,
    pub summaries: BTreeMap<&'static str, String>,
    pub steps: Vec<&'static str>,
}

pub struct TravelPlanner {
    model: Arc<dyn ChatModel>,
    tracer: Tracer,
    belts: Vec<Arc<dyn Toolbelt>>,
}

impl TravelPlanner {
    pub fn new(model: Arc<dyn ChatModel>, tracer: Tracer, belts: Vec<Arc<dyn Toolbelt>>) -> Self {
        Self { model, tracer, belts }
    }

    pub async fn run(&self, request: &str, session_id: &str) -> Result<PlanOutcome> {
        self.run_from(PlannerState::new(request, session_id, Local::now().date_naive()))
            .await
    }

    /// Run every step from `state.current_step` until the table runs out.
    pub async fn run_from(&self, mut state: PlannerState) -> Result<PlanOutcome> {
        let mut steps = Vec::new();

        while let Some(step) = Step::route(&state.current_step) {
            info!(step = step.name(), role = step.description(), session_id = %state.session_id, "Running planner step");
            self.run_step(step, &mut state)
                .await
                .with_context(|| format!("planner step '{}' failed", step.name()))?;
            steps.push(step.name());
            state.current_step = step.successor_name().to_string();
        }

        Ok(PlanOutcome {
            result: state.final_itinerary.clone().unwrap_or_default(),
            session_id: state.session_id,
            origin: state.origin,
            destination: state.destination,
            departure: state.departure,
            return_date: state.return_date,
            summaries: state.summaries,
            steps,
        })
    }

    fn toolset_for(&self, step: Step, state: &PlannerState) -> Toolset {
        match step.tools() {
            [] => Toolset::empty(),
            ["polish_itinerary"] => {
                let editor = ItineraryEditor::new(
                    self.model.clone(),
                    self.tracer.clone(),
                    &state.session_id,
                    state.summary_payload(),
                );
                Toolset::new(vec![Arc::new(editor) as Arc<dyn Toolbelt>])
            }
            tools => Toolset::only(self.belts.clone(), tools),
        }
    }

    async fn run_step(&self, step: Step, state: &mut PlannerState) -> Result<()> {
        let agent = Agent::new(step.agent(), step.instructions(), self.model.clone(), self.tracer.clone())
            .with_tools(self.toolset_for(step, state))
            .with_temperature(step.temperature());

        let run = agent
            .run(Vec::new(), &task_prompt(step, state), &state.session_id)
            .await?;
        state.capture(step, &run.answer);
        Ok(())
    }
}
