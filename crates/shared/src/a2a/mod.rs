// crates/shared/src/a2a/mod.rs
//! Wire types for the Agent-to-Agent (A2A) JSON-RPC protocol, shared by the
//! engine's A2A surface and the envoy client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const PROTOCOL_VERSION: &str = "0.3.0";
pub const JSONRPC_VERSION: &str = "2.0";
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent-card.json";
pub const DEFAULT_RPC_URL: &str = "/";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    pub preferred_transport: String,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    #[serde(default)]
    pub input_modes: Vec<String>,
    #[serde(default)]
    pub output_modes: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default = "message_kind")]
    pub kind: String,
}

fn message_kind() -> String {
    "message".to_string()
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text { text: text.into() }],
            message_id: message_id.into(),
            context_id: None,
            task_id: None,
            kind: message_kind(),
        }
    }

    pub fn in_task(mut self, context_id: &str, task_id: &str) -> Self {
        self.context_id = Some(context_id.to_string());
        self.task_id = Some(task_id.to_string());
        self
    }

    /// Text parts joined by newlines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

fn task_kind() -> String {
    "task".to_string()
}

impl Task {
    pub fn new(id: &str, context_id: &str, state: TaskState) -> Self {
        Self {
            id: id.to_string(),
            context_id: context_id.to_string(),
            status: TaskStatus {
                state,
                message: None,
                timestamp: None,
            },
            artifacts: Vec::new(),
            history: Vec::new(),
            kind: task_kind(),
        }
    }

    /// Copy with at most the last `length` history entries.
    pub fn with_history_length(&self, length: Option<usize>) -> Self {
        let mut task = self.clone();
        if let Some(length) = length {
            let skip = task.history.len().saturating_sub(length);
            task.history.drain(..skip);
        }
        task
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub kind: String,
}

impl TaskStatusUpdateEvent {
    pub fn new(task: &Task, status: TaskStatus, is_final: bool) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            status,
            is_final,
            kind: "status-update".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    pub kind: String,
}

impl TaskArtifactUpdateEvent {
    pub fn new(task: &Task, artifact: Artifact) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            artifact,
            last_chunk: Some(true),
            kind: "artifact-update".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default)]
    pub configuration: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(default)]
    pub history_length: Option<usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.to_string(),
            params: Some(params),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: impl Serialize) -> Self {
        let result = serde_json::to_value(result).unwrap_or(Value::Null);
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: &A2aError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.to_rpc()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum A2aError {
    #[error("Invalid JSON payload")]
    Parse,

    #[error("Request payload validation error")]
    InvalidRequest,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("{0}")]
    UnsupportedOperation(String),
}

impl A2aError {
    pub fn code(&self) -> i64 {
        match self {
            A2aError::Parse => -32700,
            A2aError::InvalidRequest => -32600,
            A2aError::MethodNotFound(_) => -32601,
            A2aError::InvalidParams(_) => -32602,
            A2aError::Internal(_) => -32603,
            A2aError::TaskNotFound(_) => -32001,
            A2aError::UnsupportedOperation(_) => -32004,
        }
    }

    pub fn to_rpc(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

/// The answer text of an A2A payload: the last non-blank text part of the
/// last artifact, else the last text part found anywhere.
pub fn extract_text_response(payload: &Value) -> Option<String> {
    if let Some(text) = artifact_text(payload) {
        return Some(text.trim().to_string());
    }

    let mut texts = Vec::new();
    collect_text_parts(payload, &mut texts);
    texts.last().map(|t| t.trim().to_string())
}

fn is_text_part(node: &Value) -> Option<&str> {
    if node.get("kind") == Some(&json!("text")) {
        node.get("text").and_then(Value::as_str)
    } else {
        None
    }
}

fn collect_text_parts<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
    match node {
        Value::Object(map) => {
            if let Some(text) = is_text_part(node) {
                out.push(text);
            }
            for value in map.values() {
                collect_text_parts(value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text_parts(item, out);
            }
        }
        _ => {}
    }
}

fn artifact_text(node: &Value) -> Option<&str> {
    match node {
        Value::Object(map) => {
            if let Some(Value::Array(artifacts)) = map.get("artifacts") {
                for artifact in artifacts.iter().rev() {
                    let Some(Value::Array(parts)) = artifact.get("parts") else {
                        continue;
                    };
                    let found = parts
                        .iter()
                        .rev()
                        .filter_map(is_text_part)
                        .find(|t| !t.trim().is_empty());
                    if found.is_some() {
                        return found;
                    }
                }
            }
            map.values().find_map(artifact_text)
        }
        Value::Array(items) => items.iter().rev().find_map(artifact_text),
        _ => None,
    }
}
