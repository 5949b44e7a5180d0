mod common;

use http::{header, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use cambist_engine::Message;

use common::*;

const QUESTION: &str = "Which currency would you like to convert to?";

/// Answers every prompt by asking which currency to convert to.
fn asking_model() -> std::sync::Arc<ScriptedModel> {
    ScriptedModel::new(|_messages, _tools| {
        Message::assistant(json!({ "status": "input_required", "message": QUESTION }).to_string())
    })
}

async fn sse_results(response: axum::response::Response) -> Vec<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str::<Value>(data).unwrap()["result"].clone())
        .collect()
}

fn rpc(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": "req-1", "method": method, "params": params })
}

fn user_message(text: &str) -> Value {
    json!({
        "message": {
            "role": "user",
            "parts": [{ "kind": "text", "text": text }],
            "messageId": "m-1",
            "kind": "message"
        }
    })
}

#[tokio::test]
async fn agent_card_advertises_the_currency_skill() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;

    let (status, card) = send(
        app(currency_model(), &upstream),
        get_request("/a2a/.well-known/agent-card.json"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["name"], "currency-exchange-agent");
    assert_eq!(card["url"], "http://localhost:8080/a2a");
    assert_eq!(card["preferredTransport"], "JSONRPC");
    assert_eq!(card["capabilities"]["streaming"], true);
    assert_eq!(card["capabilities"]["pushNotifications"], false);
    assert_eq!(card["defaultInputModes"], json!(["text", "text/plain"]));
    assert_eq!(card["skills"][0]["id"], "currency_exchange");
    assert_eq!(card["skills"][0]["examples"][0], "Convert 100 USD to EUR");
}

#[tokio::test]
async fn root_paths_redirect_into_the_mount() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let app = app(currency_model(), &upstream);

    let response = app
        .clone()
        .oneshot(get_request("/.well-known/agent-card.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/a2a/.well-known/agent-card.json");

    let response = app
        .oneshot(post_json("/rpc", rpc("message/send", user_message("hi"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/a2a");
}

#[tokio::test]
async fn message_send_returns_a_completed_task_that_can_be_fetched() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let app = app(currency_model(), &upstream);

    let (status, body) = send(
        app.clone(),
        post_json("/a2a", rpc("message/send", user_message("Convert 100 USD to EUR"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "req-1");
    let task = &body["result"];
    assert_eq!(task["kind"], "task");
    assert_eq!(task["status"]["state"], "completed");
    let answer = task["artifacts"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(answer.contains("0.91"));
    assert_eq!(task["history"].as_array().unwrap().len(), 2);

    let task_id = task["id"].as_str().unwrap();
    let (_, fetched) = send(
        app,
        post_json("/a2a", rpc("tasks/get", json!({ "id": task_id, "historyLength": 1 }))),
    )
    .await;
    assert_eq!(fetched["result"]["id"], task_id);
    assert_eq!(fetched["result"]["history"].as_array().unwrap().len(), 1);
    assert_eq!(fetched["result"]["history"][0]["role"], "agent");
}

#[tokio::test]
async fn empty_input_gets_guidance_without_a_model_call() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let model = currency_model();

    let (_, body) = send(
        app(model.clone(), &upstream),
        post_json("/a2a", rpc("message/send", user_message("   "))),
    )
    .await;

    let answer = body["result"]["status"]["message"]["parts"][0]["text"].as_str().unwrap();
    assert!(answer.starts_with("I didn't receive any text to process."));
    assert!(model.turns().is_empty());
}

#[tokio::test]
async fn agent_failure_maps_to_internal_error() {
    let upstream = frankfurter(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;

    let (status, body) = send(
        app(currency_model(), &upstream),
        post_json("/a2a", rpc("message/send", user_message("Convert 100 USD to EUR"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "Agent execution failed");
}

#[tokio::test]
async fn protocol_errors_use_json_rpc_codes() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let app = app(currency_model(), &upstream);

    let cases = [
        (rpc("tasks/cancel", json!({ "id": "t-1" })), -32004),
        (rpc("tasks/resubscribe", json!({ "id": "t-1" })), -32004),
        (rpc("tasks/pushNotificationConfig/set", json!({})), -32004),
        (rpc("tasks/list", json!({})), -32601),
        (rpc("tasks/get", json!({ "id": "missing" })), -32001),
        (rpc("message/send", json!({})), -32602),
        (json!({ "jsonrpc": "1.0", "id": 1, "method": "message/send" }), -32600),
    ];

    for (request, code) in cases {
        let (_, body) = send(app.clone(), post_json("/a2a", request.clone())).await;
        assert_eq!(body["error"]["code"], code, "request: {request}");
    }

    let (_, body) = send(app.clone(), post_json("/a2a", rpc("tasks/cancel", json!({ "id": "t-1" })))).await;
    assert_eq!(body["error"]["message"], "Cancel is not supported for this agent.");

    let garbage = http::Request::builder()
        .method("POST")
        .uri("/a2a")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (_, body) = send(app, garbage).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn message_stream_relays_progress_then_the_answer() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;

    let response = app(currency_model(), &upstream)
        .oneshot(post_json("/a2a", rpc("message/stream", user_message("Convert 100 USD to EUR"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let results = sse_results(response).await;
    assert_eq!(results[0]["kind"], "task");
    assert_eq!(results[0]["status"]["state"], "submitted");

    let progress: Vec<&str> = results
        .iter()
        .filter(|r| r["status"]["state"] == "working")
        .filter_map(|r| r["status"]["message"]["parts"][0]["text"].as_str())
        .collect();
    assert_eq!(
        progress,
        vec!["Looking up the exchange rates...", "Processing the exchange rates..."]
    );

    let artifact = results.iter().find(|r| r["kind"] == "artifact-update").unwrap();
    assert!(artifact["artifact"]["parts"][0]["text"].as_str().unwrap().contains("0.91"));

    let last = results.last().unwrap();
    assert_eq!(last["kind"], "status-update");
    assert_eq!(last["final"], true);
    assert_eq!(last["status"]["state"], "completed");
}

#[tokio::test]
async fn a_question_from_the_agent_leaves_the_task_input_required() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let app = app(asking_model(), &upstream);

    let (status, body) = send(
        app.clone(),
        post_json("/a2a", rpc("message/send", user_message("Convert 100 USD"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let task = &body["result"];
    assert_eq!(task["status"]["state"], "input-required");
    assert_eq!(task["status"]["message"]["parts"][0]["text"], QUESTION);
    assert!(task["artifacts"].as_array().map_or(true, Vec::is_empty));

    let (_, fetched) = send(
        app,
        post_json("/a2a", rpc("tasks/get", json!({ "id": task["id"] }))),
    )
    .await;
    assert_eq!(fetched["result"]["status"]["state"], "input-required");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn a_streamed_question_ends_the_stream_as_input_required() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;

    let response = app(asking_model(), &upstream)
        .oneshot(post_json("/a2a", rpc("message/stream", user_message("Convert 100 USD"))))
        .await
        .unwrap();
    let results = sse_results(response).await;

    assert!(results.iter().all(|r| r["kind"] != "artifact-update"));
    let last = results.last().unwrap();
    assert_eq!(last["kind"], "status-update");
    assert_eq!(last["final"], true);
    assert_eq!(last["status"]["state"], "input-required");
    assert_eq!(last["status"]["message"]["parts"][0]["text"], QUESTION);
}
