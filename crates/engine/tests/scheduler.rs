mod common;

use std::sync::Arc;

use http::StatusCode;
use serde_json::json;

use cambist_engine::task::scheduler::{CalendarFlow, ScheduleState, SchedulingAssistant};
use cambist_engine::telemetry::Tracer;
use cambist_engine::{Message, Role, ToolCall};
use cambist_shared::registry;
use cambist_shared::Tool;

use common::*;

fn call(name: &str, id: &str, args: serde_json::Value) -> Message {
    Message::assistant_tool_calls(None, vec![ToolCall::new(name, args).with_id(id)])
}

/// Plays every agent in the hierarchy, told apart by the tools offered.
fn office_reply(messages: &[Message], tools: &[Tool]) -> Message {
    let done = messages.iter().filter(|m| m.role == Role::Tool).count();
    let offered: Vec<&str> = tools.iter().map(|t| t.function.name.as_str()).collect();

    match (offered.as_slice(), done) {
        (["schedule_event", "manage_email"], 0) => call(
            "schedule_event",
            "sup-1",
            json!({ "request": "Design review with ui@example.com on 2025-03-04, one hour" }),
        ),
        (["schedule_event", "manage_email"], 1) => call(
            "manage_email",
            "sup-2",
            json!({ "request": "Tell ui@example.com the review is booked" }),
        ),
        (["schedule_event", "manage_email"], _) => Message::assistant("Review booked and the team was emailed."),

        (["create_calendar_event", "get_available_time_slots"], 0) => call(
            "get_available_time_slots",
            "cal-1",
            json!({ "attendees": ["ui@example.com"], "date": "2025-03-04", "duration_minutes": 60 }),
        ),
        (["create_calendar_event", "get_available_time_slots"], 1) => call(
            "create_calendar_event",
            "cal-2",
            json!({
                "title": "Design review",
                "start_time": "2025-03-04T14:00:00",
                "end_time": "2025-03-04T15:00:00",
                "attendees": ["ui@example.com"]
            }),
        ),
        (["create_calendar_event", "get_available_time_slots"], _) => {
            Message::assistant(messages.last().and_then(|m| m.content.clone()).unwrap_or_default())
        }

        (["send_email"], 0) => call(
            "send_email",
            "mail-1",
            json!({ "to": ["ui@example.com"], "subject": "Design review", "body": "Booked for 14:00." }),
        ),
        (["send_email"], _) => Message::assistant("Sent the summary to ui@example.com."),

        ([], _) => Message::assistant("Update: design review on March 4 at 14:00."),
        (other, _) => panic!("unexpected tools {other:?}"),
    }
}

fn office_model() -> Arc<ScriptedModel> {
    ScriptedModel::new(office_reply)
}

#[tokio::test]
async fn calendar_flow_books_then_writes_the_update() {
    let model = office_model();
    let flow = CalendarFlow::new(model.clone(), Tracer::default(), registry::toolbelts().to_vec());

    let state = flow
        .run_from(ScheduleState::new("Design review Tuesday", "s-cal"))
        .await
        .unwrap();

    assert_eq!(state.current_step, "completed");
    assert_eq!(
        state.calendar_details.as_deref(),
        Some(
            "Created 'Design review' from 2025-03-04T14:00:00 to 2025-03-04T15:00:00 \
             with 1 attendee(s) at no location."
        )
    );
    assert_eq!(
        state.schedule_response.as_deref(),
        Some("Update: design review on March 4 at 14:00.")
    );

    let turns = model.turns();
    assert_eq!(turns.len(), 4);
    let note_prompt = turns[3].messages.last().unwrap().content.clone().unwrap_or_default();
    assert!(note_prompt.contains("Calendar summary: Created 'Design review'"));
}

#[tokio::test]
async fn supervisor_delegates_to_calendar_then_email() {
    let model = office_model();
    let assistant = SchedulingAssistant::new(model.clone(), Tracer::default(), registry::toolbelts().to_vec());

    let outcome = assistant.run("Book the design review and tell the team", "s-sup").await.unwrap();

    assert_eq!(outcome.result, "Review booked and the team was emailed.");
    assert_eq!(outcome.delegations, vec!["schedule_event", "manage_email"]);

    let offered: Vec<Vec<String>> = model.turns().into_iter().map(|t| t.tools).collect();
    let offered: Vec<Vec<&str>> = offered
        .iter()
        .map(|tools| tools.iter().map(String::as_str).collect())
        .collect();
    let supervisor = vec!["schedule_event", "manage_email"];
    let calendar = vec!["create_calendar_event", "get_available_time_slots"];
    assert_eq!(
        offered,
        vec![
            supervisor.clone(),
            calendar.clone(),
            calendar.clone(),
            calendar,
            vec![],
            supervisor.clone(),
            vec!["send_email"],
            vec!["send_email"],
            supervisor,
        ]
    );

    // the supervisor sees the note agent's update as the schedule_event result
    let turns = model.turns();
    let schedule_result = turns[5].messages.last().unwrap();
    assert_eq!(schedule_result.tool_call_id.as_deref(), Some("sup-1"));
    assert_eq!(
        schedule_result.content.as_deref(),
        Some("Update: design review on March 4 at 14:00.")
    );
}

#[tokio::test]
async fn schedule_endpoint_returns_result_and_delegations() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;

    let (status, body) = send(
        app(office_model(), &upstream),
        post_json("/schedule", json!({ "prompt": "Book the design review", "session_id": "office-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Review booked and the team was emailed.");
    assert_eq!(body["session_id"], "office-1");
    assert_eq!(body["delegations"], json!(["schedule_event", "manage_email"]));
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn schedule_endpoint_rejects_an_oversized_prompt() {
    let upstream = frankfurter(StatusCode::OK, eur_rates()).await;
    let model = office_model();

    let (status, _) = send(
        app(model.clone(), &upstream),
        post_json("/schedule", json!({ "prompt": "x".repeat(2049) })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(model.turns().is_empty());
}
