// Ollama native chat API: object-valued tool arguments, no call ids.

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cambist_shared::Tool;

use super::{check_status, ChatOptions};
use crate::config::ModelConfig;
use crate::{Message, Role, ToolCall};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    options: RequestOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: Role,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<&'a [ToolCall]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
}

#[derive(Serialize)]
struct RequestOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl ResponseMessage {
    fn to_message(self) -> Message {
        Message {
            role: Role::Assistant,
            content: self.content.filter(|c| !c.is_empty()),
            tool_calls: self.tool_calls.filter(|c| !c.is_empty()),
            tool_call_id: None,
            name: None,
        }
    }
}

pub(super) async fn complete(
    client: &Client,
    config: &ModelConfig,
    messages: &[Message],
    tools: &[Tool],
    options: &ChatOptions,
) -> Result<Message> {
    let request = ChatRequest {
        model: &config.model,
        messages: messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role,
                content: m.content.as_deref().unwrap_or(""),
                tool_calls: m.tool_calls.as_deref(),
                tool_name: m.name.as_deref(),
            })
            .collect(),
        stream: false,
        tools: if tools.is_empty() { None } else { Some(tools) },
        options: RequestOptions {
            temperature: options.temperature,
        },
    };

    let mut builder = client.post(config.chat_url()).json(&request);
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        builder = builder.bearer_auth(key);
    }

    let response = check_status(builder.send().await?).await?;
    let body: ChatResponse = response.json().await?;

    Ok(body.message.to_message())
}
