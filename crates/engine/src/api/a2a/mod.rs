//! A2A surface: agent card plus the JSON-RPC endpoint, mounted under the
//! configured A2A path.

pub mod card;
pub mod store;
pub mod stream;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use cambist_shared::a2a::{
    A2aError, Artifact, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams, Part, Role, Task,
    TaskQueryParams, TaskState, TaskStatus, JSONRPC_VERSION,
};

use super::AppState;
use crate::config::A2aConfig;
use crate::error::RunError;
use crate::events::EventSender;
use crate::task::reply::CurrencyReply;

pub const AGENT_EXECUTION_FAILED: &str = "Agent execution failed";
pub const EMPTY_INPUT_REPLY: &str =
    "I didn't receive any text to process. Please ask a question about currency exchange.";
pub const CANCEL_UNSUPPORTED: &str = "Cancel is not supported for this agent.";

const UNSUPPORTED_METHODS: &[&str] = &[
    "tasks/resubscribe",
    "tasks/pushNotificationConfig/set",
    "tasks/pushNotificationConfig/get",
    "tasks/pushNotificationConfig/list",
    "tasks/pushNotificationConfig/delete",
];

/// Routes relative to the mount path.
pub fn router(config: &A2aConfig) -> Router<AppState> {
    Router::new()
        .route(&config.card_path, get(agent_card))
        .route(&config.rpc_route, post(handle_rpc))
}

/// Absolute path of the JSON-RPC endpoint.
pub fn rpc_path(config: &A2aConfig) -> String {
    if config.rpc_route == "/" {
        config.mount_path.clone()
    } else {
        format!("{}{}", config.mount_path, config.rpc_route)
    }
}

/// Absolute path of the agent card.
pub fn card_path(config: &A2aConfig) -> String {
    format!("{}{}", config.mount_path, config.card_path)
}

async fn agent_card(State(state): State<AppState>) -> Json<cambist_shared::a2a::AgentCard> {
    Json(card::build_card(&state.config.a2a))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn rpc_reply(response: JsonRpcResponse) -> Response {
    Json(response).into_response()
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, A2aError> {
    serde_json::from_value(params).map_err(|e| A2aError::InvalidParams(e.to_string()))
}

pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejected unparsable JSON-RPC payload");
            return rpc_reply(JsonRpcResponse::failure(Value::Null, &A2aError::Parse));
        }
    };

    let id = payload.get("id").cloned().unwrap_or(Value::Null);
    let request = match serde_json::from_value::<JsonRpcRequest>(payload) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => request,
        _ => return rpc_reply(JsonRpcResponse::failure(id, &A2aError::InvalidRequest)),
    };

    info!(method = %request.method, "A2A request");
    let params = request.params.unwrap_or(Value::Null);

    let result = match request.method.as_str() {
        "message/send" => match parse_params::<MessageSendParams>(params) {
            Ok(params) => send_message(&state, params)
                .await
                .and_then(|task| serde_json::to_value(task).map_err(|e| A2aError::Internal(e.to_string()))),
            Err(e) => Err(e),
        },
        "message/stream" => {
            return match parse_params::<MessageSendParams>(params)
                .and_then(|params| stream::stream_message(state, id.clone(), params))
            {
                Ok(sse) => sse.into_response(),
                Err(e) => rpc_reply(JsonRpcResponse::failure(id, &e)),
            };
        }
        "tasks/get" => get_task(&state, params),
        "tasks/cancel" => Err(A2aError::UnsupportedOperation(CANCEL_UNSUPPORTED.to_string())),
        method if UNSUPPORTED_METHODS.contains(&method) => Err(A2aError::UnsupportedOperation(format!(
            "{} is not supported for this agent.",
            method
        ))),
        other => Err(A2aError::MethodNotFound(other.to_string())),
    };

    rpc_reply(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, &e),
    })
}

/// Task the message belongs to: the stored one it names, or a new task.
/// Returns the task with the message appended and the joined input text.
fn open_task(state: &AppState, mut message: Message) -> (Task, String) {
    let stored = message.task_id.as_deref().and_then(|id| state.tasks.get(id));

    let mut task = stored.unwrap_or_else(|| {
        let context_id = message.context_id.clone().unwrap_or_else(new_id);
        let task_id = message.task_id.clone().unwrap_or_else(new_id);
        Task::new(&task_id, &context_id, TaskState::Submitted)
    });

    let input = message.joined_text().trim().to_string();
    message.context_id = Some(task.context_id.clone());
    message.task_id = Some(task.id.clone());
    task.history.push(message);
    task.status = status(&task, TaskState::Submitted, None);
    (task, input)
}

fn status(task: &Task, state: TaskState, text: Option<&str>) -> TaskStatus {
    TaskStatus {
        state,
        message: text.map(|t| Message::text(Role::Agent, t, new_id()).in_task(&task.context_id, &task.id)),
        timestamp: Some(Utc::now().to_rfc3339()),
    }
}

/// Record `answer` as the task's artifact and completed status.
fn complete_task(task: &mut Task, answer: &str) -> Artifact {
    let artifact = Artifact {
        artifact_id: new_id(),
        name: Some("currency_answer".to_string()),
        parts: vec![Part::Text {
            text: answer.to_string(),
        }],
    };
    task.artifacts.push(artifact.clone());

    task.status = status(task, TaskState::Completed, Some(answer));
    if let Some(message) = task.status.message.clone() {
        task.history.push(message);
    }
    artifact
}

/// Hand the turn back to the user with `question`; the task stays open.
fn request_input(task: &mut Task, question: &str) {
    task.status = status(task, TaskState::InputRequired, Some(question));
    if let Some(message) = task.status.message.clone() {
        task.history.push(message);
    }
}

fn fail_task(task: &mut Task, reason: &str) {
    task.status = status(task, TaskState::Failed, Some(reason));
}

/// Run the currency agent for one A2A message, keyed on the context id.
async fn answer(
    state: &AppState,
    context_id: &str,
    input: &str,
    events: Option<EventSender>,
) -> Result<CurrencyReply, A2aError> {
    if input.is_empty() {
        return Ok(CurrencyReply::completed(EMPTY_INPUT_REPLY));
    }

    match state.runtime.run(input, Some(context_id), events).await {
        Ok(reply) => Ok(reply),
        Err(RunError::Config(e)) => {
            error!(error = %e, "model configuration error");
            Err(A2aError::Internal(e.to_string()))
        }
        Err(e) => {
            error!(error = %e, context_id, "A2A agent execution failed");
            Err(A2aError::Internal(AGENT_EXECUTION_FAILED.to_string()))
        }
    }
}

async fn send_message(state: &AppState, params: MessageSendParams) -> Result<Task, A2aError> {
    let (mut task, input) = open_task(state, params.message);

    match answer(state, &task.context_id, &input, None).await {
        Ok(reply) if reply.needs_input() => {
            request_input(&mut task, &reply.message);
            state.tasks.save(&task);
            Ok(task)
        }
        Ok(reply) => {
            complete_task(&mut task, &reply.message);
            state.tasks.save(&task);
            Ok(task)
        }
        Err(e) => {
            fail_task(&mut task, &e.to_string());
            state.tasks.save(&task);
            Err(e)
        }
    }
}

fn get_task(state: &AppState, params: Value) -> Result<Value, A2aError> {
    let query: TaskQueryParams = parse_params(params)?;
    let task = state
        .tasks
        .get(&query.id)
        .ok_or_else(|| A2aError::TaskNotFound(query.id.clone()))?;

    serde_json::to_value(task.with_history_length(query.history_length))
        .map_err(|e| A2aError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mount: &str, rpc: &str) -> A2aConfig {
        A2aConfig {
            agent_name: "currency-exchange-agent".into(),
            mount_path: mount.into(),
            card_path: "/.well-known/agent-card.json".into(),
            rpc_route: rpc.into(),
            public_url: format!("http://localhost:8080{}", mount),
            version: "1.0.0".into(),
            documentation_url: None,
            api_key: None,
        }
    }

    #[test]
    fn rpc_path_drops_a_root_route() {
        assert_eq!(rpc_path(&config("/a2a", "/")), "/a2a");
        assert_eq!(rpc_path(&config("/agents/fx", "/rpc")), "/agents/fx/rpc");
        assert_eq!(card_path(&config("/a2a", "/")), "/a2a/.well-known/agent-card.json");
    }

    #[test]
    fn completing_a_task_records_the_answer_everywhere() {
        let mut task = Task::new("t-1", "c-1", TaskState::Working);
        let artifact = complete_task(&mut task, "100 USD is 91 EUR");

        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts, vec![artifact]);
        let message = task.status.message.as_ref().unwrap();
        assert_eq!(message.joined_text(), "100 USD is 91 EUR");
        assert_eq!(message.context_id.as_deref(), Some("c-1"));
        assert_eq!(task.history.len(), 1);
    }

    #[test]
    fn a_question_leaves_the_task_waiting_without_an_artifact() {
        let mut task = Task::new("t-2", "c-2", TaskState::Working);
        request_input(&mut task, "Which currency should I convert to?");

        assert_eq!(task.status.state, TaskState::InputRequired);
        assert!(task.artifacts.is_empty());
        assert_eq!(task.history.len(), 1);
        assert_eq!(
            task.status.message.as_ref().unwrap().joined_text(),
            "Which currency should I convert to?"
        );
    }
}
