use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

pub use cambist_shared::events::AgentEvent;

type Channels = HashMap<String, broadcast::Sender<AgentEvent>>;

// Global event broadcaster, one channel per in-flight request
static EVENT_CHANNELS: Lazy<Mutex<Channels>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn channels() -> MutexGuard<'static, Channels> {
    EVENT_CHANNELS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create the event channel for a request; `None` while one is already open
pub fn create_channel(id: &str) -> Option<broadcast::Receiver<AgentEvent>> {
    match channels().entry(id.to_string()) {
        Entry::Occupied(_) => None,
        Entry::Vacant(slot) => {
            let (tx, rx) = broadcast::channel(100);
            slot.insert(tx);
            Some(rx)
        }
    }
}

/// Send an event to a specific channel
pub fn send_event(id: &str, event: AgentEvent) {
    if let Some(tx) = channels().get(id) {
        let _ = tx.send(event); // no receivers is fine
    }
}

/// Clean up a channel when done
pub fn cleanup_channel(id: &str) {
    channels().remove(id);
}

/// Helper to send events from anywhere in a run
#[derive(Clone, Debug)]
pub struct EventSender {
    request_id: String,
}

impl EventSender {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    pub fn tool_call(&self, step: &str, tool: &str, args: serde_json::Value) {
        send_event(&self.request_id, AgentEvent::ToolCall {
            step: step.to_string(),
            tool: tool.to_string(),
            args,
        });
    }

    pub fn tool_result(&self, step: &str, tool: &str, result: &str) {
        send_event(&self.request_id, AgentEvent::tool_result(step, tool, result));
    }

    pub fn complete(&self, content: &str) {
        send_event(&self.request_id, AgentEvent::Completed {
            content: content.to_string(),
        });
        cleanup_channel(&self.request_id);
    }

    pub fn input_required(&self, question: &str) {
        send_event(&self.request_id, AgentEvent::InputRequired {
            question: question.to_string(),
        });
        cleanup_channel(&self.request_id);
    }

    pub fn error(&self, message: &str) {
        send_event(&self.request_id, AgentEvent::Failed {
            message: message.to_string(),
        });
        cleanup_channel(&self.request_id);
    }
}
