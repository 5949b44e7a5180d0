//! The currency agent's final answer: a status plus the text for the user.

use serde::{Deserialize, Serialize};

pub const REPLY_FORMAT_INSTRUCTIONS: &str = "Reply with a JSON object {\"status\": ..., \"message\": ...}. \
     Set status to input_required if the user needs to provide more information to complete the request. \
     Set status to error if there is an error while processing the request. \
     Set status to completed if the request is complete.";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    InputRequired,
    Completed,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrencyReply {
    pub status: ReplyStatus,
    pub message: String,
}

impl CurrencyReply {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Completed,
            message: message.into(),
        }
    }

    /// Read the agent's final text. A reply that is not the status object,
    /// with or without a code fence, is taken as a completed answer.
    pub fn parse(answer: &str) -> Self {
        let trimmed = answer.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();

        serde_json::from_str(body).unwrap_or_else(|_| Self::completed(answer))
    }

    /// Errors also hand the turn back to the user.
    pub fn needs_input(&self) -> bool {
        self.status != ReplyStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_completed_answer() {
        let reply = CurrencyReply::parse("100 USD is 91.00 EUR.");
        assert_eq!(reply, CurrencyReply::completed("100 USD is 91.00 EUR."));
        assert!(!reply.needs_input());
    }

    #[test]
    fn status_object_is_read_even_inside_a_fence() {
        let reply = CurrencyReply::parse(
            "```json\n{\"status\": \"input_required\", \"message\": \"Which currency should I convert to?\"}\n```",
        );
        assert_eq!(reply.status, ReplyStatus::InputRequired);
        assert_eq!(reply.message, "Which currency should I convert to?");
        assert!(reply.needs_input());
    }

    #[test]
    fn error_status_asks_the_user_again() {
        let reply = CurrencyReply::parse(r#"{"status": "error", "message": "The rate service is down."}"#);
        assert_eq!(reply.status, ReplyStatus::Error);
        assert!(reply.needs_input());
    }

    #[test]
    fn unknown_status_falls_back_to_the_raw_text() {
        let raw = r#"{"status": "pending", "message": "hm"}"#;
        assert_eq!(CurrencyReply::parse(raw), CurrencyReply::completed(raw));
    }
}
