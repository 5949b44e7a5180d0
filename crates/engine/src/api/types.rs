use serde::{Deserialize, Serialize};

pub const MAX_PROMPT_CHARS: usize = 2048;

// Invoke endpoint
#[derive(Deserialize, Serialize, Debug)]
pub struct InvokeRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InvokeResponse {
    pub result: String,
}

// Travel planner
#[derive(Deserialize, Serialize, Debug)]
pub struct PlanRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

// Scheduling supervisor
pub type ScheduleRequest = PlanRequest;

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
}

/// Rejects prompts over [`MAX_PROMPT_CHARS`] characters.
pub fn validate_prompt(prompt: &str) -> Result<(), String> {
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(format!(
            "prompt must be at most {} characters, got {}",
            MAX_PROMPT_CHARS, chars
        ));
    }
    Ok(())
}
