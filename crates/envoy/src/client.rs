use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use cambist_shared::a2a::{
    extract_text_response, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Role,
    AGENT_CARD_WELL_KNOWN_PATH,
};

#[derive(Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
pub struct InvokeResponse {
    pub result: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(url))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let detail = body["detail"].as_str().unwrap_or("no details");
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(anyhow!("Unauthorized - set the key with `envoy config set api-key KEY`"));
        }
        Err(anyhow!("Request failed ({}): {}", status, detail))
    }

    pub async fn invoke(&self, prompt: &str, session_id: Option<&str>) -> Result<String> {
        let url = format!("{}/invoke", self.base_url);
        let response = self
            .post(&url)
            .json(&PromptRequest { prompt, session_id })
            .send()
            .await?;

        Ok(Self::check(response).await?.json::<InvokeResponse>().await?.result)
    }

    /// POST a bare prompt to `path` and return the JSON outcome.
    async fn post_prompt(&self, path: &str, prompt: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .post(&url)
            .json(&PromptRequest { prompt, session_id: None })
            .send()
            .await?;

        Ok(Self::check(response).await?.json::<Value>().await?)
    }

    pub async fn plan(&self, prompt: &str) -> Result<Value> {
        self.post_prompt("/plan", prompt).await
    }

    pub async fn schedule(&self, prompt: &str) -> Result<Value> {
        self.post_prompt("/schedule", prompt).await
    }

    /// The agent card, through the root redirect.
    pub async fn agent_card(&self) -> Result<AgentCard> {
        let url = format!("{}{}", self.base_url, AGENT_CARD_WELL_KNOWN_PATH);
        let response = self.get(&url).send().await?;
        Ok(Self::check(response).await?.json::<AgentCard>().await?)
    }

    fn message_request(method: &str, text: &str, context_id: &str) -> JsonRpcRequest {
        let message = Message {
            context_id: Some(context_id.to_string()),
            ..Message::text(Role::User, text, Uuid::new_v4().to_string())
        };
        JsonRpcRequest::new(Uuid::new_v4().to_string(), method, json!({ "message": message }))
    }

    /// `message/stream` against `endpoint`, calling `on_event` with every
    /// result. Returns the answer text.
    pub async fn stream_message(
        &self,
        endpoint: &str,
        text: &str,
        context_id: &str,
        mut on_event: impl FnMut(&Value),
    ) -> Result<Option<String>> {
        let request = Self::message_request("message/stream", text, context_id);
        let response = self
            .post(endpoint)
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut results = Vec::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            for event in take_events(&mut buffer) {
                let response: JsonRpcResponse = serde_json::from_value(event)?;
                if let Some(error) = response.error {
                    return Err(anyhow!("Agent error {}: {}", error.code, error.message));
                }
                if let Some(result) = response.result {
                    on_event(&result);
                    results.push(result);
                }
            }
        }

        stream_outcome(results)
    }
}

/// Answer of a finished stream. A run whose last update is `failed` is an
/// error carrying the agent's reason.
pub fn stream_outcome(results: Vec<Value>) -> Result<Option<String>> {
    if let Some(last) = results.last() {
        if last["status"]["state"] == "failed" {
            let reason = extract_text_response(&last["status"]).unwrap_or_else(|| "no details".to_string());
            return Err(anyhow!("Agent run failed: {}", reason));
        }
    }
    Ok(extract_text_response(&Value::Array(results)))
}

/// Drain complete `data:` lines from an SSE buffer.
pub fn take_events(buffer: &mut Vec<u8>) -> Vec<Value> {
    let mut events = Vec::new();

    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = String::from_utf8_lossy(&line);

        // SSE format: "data: {json}\n"
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if let Ok(event) = serde_json::from_str::<Value>(data) {
                events.push(event);
            }
        }
    }

    events
}
