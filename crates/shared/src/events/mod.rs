use serde::{Deserialize, Serialize};

/// Tool results longer than this are cut before being broadcast.
pub const RESULT_PREVIEW_LEN: usize = 500;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCall {
        step: String,
        tool: String,
        args: serde_json::Value,
    },
    ToolResult {
        step: String,
        tool: String,
        result: String,
        truncated: bool,
    },
    Completed {
        content: String,
    },
    /// The run ended by asking the user for more detail.
    InputRequired {
        question: String,
    },
    Failed {
        message: String,
    },
}

impl AgentEvent {
    pub fn tool_result(step: &str, tool: &str, result: &str) -> Self {
        let truncated = result.chars().count() > RESULT_PREVIEW_LEN;
        let result = if truncated {
            result.chars().take(RESULT_PREVIEW_LEN).collect()
        } else {
            result.to_string()
        };

        AgentEvent::ToolResult {
            step: step.to_string(),
            tool: tool.to_string(),
            result,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_results_are_truncated() {
        let long = "x".repeat(RESULT_PREVIEW_LEN + 20);
        match AgentEvent::tool_result("router", "get_exchange_rate", &long) {
            AgentEvent::ToolResult { result, truncated, .. } => {
                assert!(truncated);
                assert_eq!(result.len(), RESULT_PREVIEW_LEN);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = AgentEvent::Completed { content: "done".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
    }
}
