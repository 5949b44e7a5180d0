//! `message/stream`: the agent run relayed as server-sent JSON-RPC events.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use cambist_shared::a2a::{
    A2aError, JsonRpcResponse, MessageSendParams, Task, TaskArtifactUpdateEvent, TaskState,
    TaskStatusUpdateEvent,
};

use super::{answer, complete_task, fail_task, open_task, request_input, status, AGENT_EXECUTION_FAILED};
use crate::api::AppState;
use crate::events::{self, AgentEvent, EventSender};

pub const LOOKING_UP: &str = "Looking up the exchange rates...";
pub const PROCESSING: &str = "Processing the exchange rates...";

/// Start the run and relay it as SSE. A task that is already streaming is
/// rejected.
pub fn stream_message(
    state: AppState,
    id: Value,
    params: MessageSendParams,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, A2aError> {
    let (task, input) = open_task(&state, params.message);

    // Subscribe before the run starts so no event is missed
    let agent_events = events::create_channel(&task.id).ok_or_else(|| {
        warn!(task_id = %task.id, "Rejected a second stream for a running task");
        A2aError::InvalidParams(format!("Task {} is already streaming", task.id))
    })?;
    state.tasks.save(&task);
    let sender = EventSender::new(task.id.clone());

    let runner_state = state.clone();
    let context_id = task.context_id.clone();
    tokio::spawn(async move {
        match answer(&runner_state, &context_id, &input, Some(sender.clone())).await {
            Ok(reply) if reply.needs_input() => sender.input_required(&reply.message),
            Ok(reply) => sender.complete(&reply.message),
            Err(e) => sender.error(&e.to_string()),
        }
    });

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(relay(state, id, task, agent_events, tx));

    let stream = ReceiverStream::new(rx).map(|response: JsonRpcResponse| {
        Ok::<_, Infallible>(Event::default().data(serde_json::to_string(&response).unwrap_or_default()))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn status_update(task: &mut Task, state: TaskState, text: &str, is_final: bool) -> TaskStatusUpdateEvent {
    task.status = status(task, state, Some(text));
    let current = task.status.clone();
    TaskStatusUpdateEvent::new(task, current, is_final)
}

/// Turns agent events into A2A events until the run finishes. The task
/// store is kept current even after the client goes away.
async fn relay(
    state: AppState,
    id: Value,
    mut task: Task,
    mut agent_events: broadcast::Receiver<AgentEvent>,
    tx: mpsc::Sender<JsonRpcResponse>,
) {
    let mut client = Some(tx);
    let mut finished = false;

    let mut updates = vec![JsonRpcResponse::success(id.clone(), &task)];

    loop {
        if let Some(tx) = client.take() {
            let mut connected = true;
            for update in updates.drain(..) {
                if tx.send(update).await.is_err() {
                    debug!(task_id = %task.id, "Stream client disconnected");
                    connected = false;
                    break;
                }
            }
            if connected {
                client = Some(tx);
            }
        }
        updates.clear();

        if finished {
            break;
        }

        let event = match agent_events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(task_id = %task.id, skipped, "Stream lagged behind agent events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                fail_task(&mut task, AGENT_EXECUTION_FAILED);
                state.tasks.save(&task);
                let update = TaskStatusUpdateEvent::new(&task, task.status.clone(), true);
                updates.push(JsonRpcResponse::success(id.clone(), &update));
                finished = true;
                continue;
            }
        };

        match event {
            AgentEvent::ToolCall { .. } => {
                let update = status_update(&mut task, TaskState::Working, LOOKING_UP, false);
                updates.push(JsonRpcResponse::success(id.clone(), &update));
            }
            AgentEvent::ToolResult { .. } => {
                let update = status_update(&mut task, TaskState::Working, PROCESSING, false);
                updates.push(JsonRpcResponse::success(id.clone(), &update));
            }
            AgentEvent::Completed { content } => {
                let artifact = complete_task(&mut task, &content);
                let artifact_update = TaskArtifactUpdateEvent::new(&task, artifact);
                let final_update = TaskStatusUpdateEvent::new(&task, task.status.clone(), true);
                updates.push(JsonRpcResponse::success(id.clone(), &artifact_update));
                updates.push(JsonRpcResponse::success(id.clone(), &final_update));
                finished = true;
            }
            AgentEvent::InputRequired { question } => {
                request_input(&mut task, &question);
                let update = TaskStatusUpdateEvent::new(&task, task.status.clone(), true);
                updates.push(JsonRpcResponse::success(id.clone(), &update));
                finished = true;
            }
            AgentEvent::Failed { message } => {
                let update = status_update(&mut task, TaskState::Failed, &message, true);
                updates.push(JsonRpcResponse::success(id.clone(), &update));
                finished = true;
            }
        }
        state.tasks.save(&task);
    }
}
