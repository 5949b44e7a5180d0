#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use cambist_engine::api::{create_router, AppState};
use cambist_engine::config::{map_lookup, Config};
use cambist_engine::model::{ChatModel, ChatOptions, ModelDescriptor};
use cambist_engine::runtime::AgentRuntime;
use cambist_engine::telemetry::Tracer;
use cambist_engine::{Message, Role, ToolCall};
use cambist_shared::toolbelts::exchange_rate::{rate, ExchangeRate, ExchangeRateConfig};
use cambist_shared::{Tool, Toolbelt};

type Script = dyn Fn(&[Message], &[Tool]) -> Result<Message> + Send + Sync;

/// One recorded model turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub tools: Vec<String>,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

/// Chat model whose replies come from a closure over the conversation.
pub struct ScriptedModel {
    script: Box<Script>,
    turns: Mutex<Vec<Turn>>,
}

impl ScriptedModel {
    pub fn new(script: impl Fn(&[Message], &[Tool]) -> Message + Send + Sync + 'static) -> Arc<Self> {
        Self::fallible(move |messages, tools| Ok(script(messages, tools)))
    }

    /// A script that may fail a turn, as an unreachable provider would.
    pub fn fallible(script: impl Fn(&[Message], &[Tool]) -> Result<Message> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            turns: Mutex::new(Vec::new()),
        })
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            provider: "scripted".into(),
            model: "scripted-1".into(),
            server_address: None,
            server_port: None,
        }
    }

    async fn complete(&self, messages: &[Message], tools: &[Tool], options: &ChatOptions) -> Result<Message> {
        self.turns.lock().unwrap().push(Turn {
            tools: tools.iter().map(|t| t.function.name.clone()).collect(),
            temperature: options.temperature,
            messages: messages.to_vec(),
        });
        (self.script)(messages, tools)
    }
}

/// Calls `get_exchange_rate(USD, EUR)` once, then reports the EUR rate
/// from the tool result.
pub fn currency_model() -> Arc<ScriptedModel> {
    ScriptedModel::new(|messages, _tools| {
        let last = messages.last().unwrap();
        match last.role {
            Role::Tool => {
                let payload: Value = serde_json::from_str(last.content.as_deref().unwrap_or("{}"))
                    .unwrap_or(Value::Null);
                match rate(&payload, "EUR") {
                    Some(eur) => Message::assistant(format!(
                        "100 USD is {:.2} EUR at a rate of {}.",
                        100.0 * eur,
                        eur
                    )),
                    None => Message::assistant(format!("Tool said: {}", last.content.clone().unwrap_or_default())),
                }
            }
            _ => Message::assistant_tool_calls(
                None,
                vec![ToolCall::new(
                    "get_exchange_rate",
                    json!({ "currency_from": "USD", "currency_to": "EUR", "currency_date": "latest" }),
                )
                .with_id("call-1")],
            ),
        }
    })
}

/// Local stand-in for the Frankfurter API.
#[derive(Clone)]
pub struct Frankfurter {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
}

impl Frankfurter {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn belt(&self) -> Arc<dyn Toolbelt> {
        Arc::new(ExchangeRate::with_config(ExchangeRateConfig {
            api_url: self.url.clone(),
            timeout: Duration::from_secs(2),
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
        }))
    }
}

#[derive(Clone)]
struct Upstream {
    hits: Arc<AtomicUsize>,
    status: StatusCode,
    body: Value,
}

async fn rates(State(upstream): State<Upstream>, Path(_date): Path<String>) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    (upstream.status, Json(upstream.body.clone())).into_response()
}

pub async fn frankfurter(status: StatusCode, body: Value) -> Frankfurter {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route("/{date}", get(rates)).with_state(Upstream {
        hits: hits.clone(),
        status,
        body,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Frankfurter {
        url: format!("http://{addr}"),
        hits,
    }
}

pub fn eur_rates() -> Value {
    json!({ "amount": 1.0, "base": "USD", "date": "2025-03-03", "rates": { "EUR": 0.91 } })
}

pub fn config(vars: &[(&str, &str)]) -> Config {
    let lookup = map_lookup(
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    );
    Config::from_lookup(&lookup, None, None).unwrap()
}

pub fn app_with(runtime: AgentRuntime, config: Config) -> Router {
    create_router(AppState::new(Arc::new(runtime), config))
}

/// Router over a scripted model and a local Frankfurter.
pub fn app(model: Arc<ScriptedModel>, upstream: &Frankfurter) -> Router {
    let runtime = AgentRuntime::with_model(model, Tracer::default()).with_exchange(upstream.belt());
    app_with(runtime, config(&[]))
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
