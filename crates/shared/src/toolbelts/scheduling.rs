use anyhow::Result;
use serde_json::{json, Value};

use crate::register_toolbelt;
use crate::schemas::{required_str, required_u64, str_arg, str_list};

/// Slots offered for any attendees, date and duration.
pub const OPEN_SLOTS: &[&str] = &["09:00", "14:00", "16:00"];

/// Synthetic calendar and email APIs.
#[derive(Default)]
pub struct Scheduling;

register_toolbelt! {
    Scheduling {
        description: "Synthetic calendar and email APIs",
        tools: {
            "create_calendar_event" => create_calendar_event {
                description: "Create a calendar event from normalized inputs.",
                params: [
                    "title": "string" => "Event title",
                    "start_time": "string" => "Start time (ISO 8601)",
                    "end_time": "string" => "End time (ISO 8601)",
                    "attendees": "array" => "Attendee names or addresses",
                    "location": "string" => "Where the event takes place" = ""
                ]
            },
            "get_available_time_slots" => get_available_time_slots {
                description: "Return available time slots for attendees on a date.",
                params: [
                    "attendees": "array" => "Attendee names or addresses",
                    "date": "string" => "Date to check (YYYY-MM-DD)",
                    "duration_minutes": "integer" => "Meeting length in minutes"
                ]
            },
            "send_email" => send_email {
                description: "Send an email via the synthetic email API.",
                params: [
                    "to": "array" => "Recipients",
                    "subject": "string" => "Subject line",
                    "body": "string" => "Message body",
                    "cc": "array" => "Copied recipients" = ""
                ]
            }
        }
    }
}

impl Scheduling {
    async fn create_calendar_event(&self, args: &Value) -> Result<String> {
        let title = required_str(args, "title")?;
        let start = required_str(args, "start_time")?;
        let end = required_str(args, "end_time")?;
        let attendees = str_list(args, "attendees", true)?;
        let location = str_arg(args, "location", "")?.trim();

        Ok(format!(
            "Created '{}' from {} to {} with {} attendee(s) at {}.",
            title,
            start,
            end,
            attendees.len(),
            if location.is_empty() { "no location" } else { location }
        ))
    }

    async fn get_available_time_slots(&self, args: &Value) -> Result<String> {
        str_list(args, "attendees", true)?;
        required_str(args, "date")?;
        required_u64(args, "duration_minutes")?;

        Ok(json!(OPEN_SLOTS).to_string())
    }

    async fn send_email(&self, args: &Value) -> Result<String> {
        let to = str_list(args, "to", true)?;
        let subject = required_str(args, "subject")?;
        let body = required_str(args, "body")?;
        let cc = str_list(args, "cc", false)?;

        let cc_part = if cc.is_empty() {
            String::new()
        } else {
            format!(" (cc: {})", cc.join(", "))
        };

        Ok(format!(
            "Email sent to {}{}\nSubject: {}\nBody: {}",
            to.join(", "),
            cc_part,
            subject,
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{ToolError, Toolbelt};

    #[tokio::test]
    async fn event_summary_counts_attendees() {
        let out = Scheduling
            .call(
                "create_calendar_event",
                &json!({
                    "title": "Design review",
                    "start_time": "2025-03-04T14:00:00",
                    "end_time": "2025-03-04T15:00:00",
                    "attendees": ["ui@example.com", "pm@example.com"]
                }),
            )
            .await
            .unwrap();
        assert_eq!(
            out,
            "Created 'Design review' from 2025-03-04T14:00:00 to 2025-03-04T15:00:00 \
             with 2 attendee(s) at no location."
        );
    }

    #[tokio::test]
    async fn slots_are_a_json_list() {
        let out = Scheduling
            .call(
                "get_available_time_slots",
                &json!({ "attendees": ["data-science"], "date": "2025-03-05", "duration_minutes": 30 }),
            )
            .await
            .unwrap();
        let slots: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(slots, OPEN_SLOTS);
    }

    #[tokio::test]
    async fn email_lists_recipients_and_cc() {
        let out = Scheduling
            .call(
                "send_email",
                &json!({
                    "to": ["sales@example.com"],
                    "cc": ["lead@example.com"],
                    "subject": "Demo on Friday",
                    "body": "Bring pricing questions."
                }),
            )
            .await
            .unwrap();
        assert!(out.starts_with("Email sent to sales@example.com (cc: lead@example.com)\n"));
        assert!(out.ends_with("Body: Bring pricing questions."));
    }

    #[tokio::test]
    async fn missing_duration_is_a_tool_error() {
        let err = Scheduling
            .call("get_available_time_slots", &json!({ "attendees": ["a"], "date": "2025-03-05" }))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::InvalidArguments(_))));
    }
}
