// OpenAI chat-completions wire format: Gemini's compatibility endpoint,
// Azure OpenAI deployments and any other compatible server.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use cambist_shared::Tool;

use super::{check_status, ChatOptions};
use crate::config::{ModelConfig, ModelSource};
use crate::{FunctionCall, Message, Role, ToolCall};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    temperature: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunction {
    name: String,
    /// JSON-encoded object.
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    call_type: function_type(),
                    function: WireFunction {
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.to_string(),
                    },
                })
                .collect()
        });

        WireMessage {
            role: message.role,
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

impl WireMessage {
    fn into_message(self) -> Message {
        let tool_calls = self.tool_calls.filter(|c| !c.is_empty()).map(|calls| {
            calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    function: FunctionCall {
                        arguments: parse_arguments(&call.function.name, &call.function.arguments),
                        name: call.function.name,
                    },
                })
                .collect()
        });

        Message {
            role: Role::Assistant,
            content: self.content,
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool, error = %e, "Model sent undecodable tool arguments");
        json!({})
    })
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
        messages: messages.iter().map(WireMessage::from).collect(),
        tools: if tools.is_empty() { None } else { Some(tools) },
        temperature: options.temperature,
    };

    let mut builder = client.post(config.chat_url()).json(&request);
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        builder = match config.source {
            ModelSource::Azure => builder.header("api-key", key),
            _ => builder.bearer_auth(key),
        };
    }

    let response = check_status(builder.send().await?).await?;
    let body: ChatResponse = response.json().await?;

    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.into_message())
        .ok_or_else(|| anyhow!("model response contained no choices"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_arguments_are_string_encoded_on_the_wire() {
        let call = ToolCall::new("get_exchange_rate", json!({ "currency_from": "USD" })).with_id("call_1");
        let message = Message::assistant_tool_calls(None, vec![call]);
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            json!("{\"currency_from\":\"USD\"}")
        );
    }

    #[test]
    fn reply_arguments_are_decoded() {
        let wire: WireMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": { "name": "get_exchange_rate", "arguments": "{\"currency_to\":\"EUR\"}" }
            }]
        }))
        .unwrap();
        let message = wire.into_message();
        let call = &message.requested_tools()[0];
        assert_eq!(call.id.as_deref(), Some("call_9"));
        assert_eq!(call.function.arguments["currency_to"], "EUR");
    }

    #[test]
    fn garbage_arguments_become_empty_object() {
        assert_eq!(parse_arguments("t", "{not json"), json!({}));
        assert_eq!(parse_arguments("t", ""), json!({}));
    }
}
