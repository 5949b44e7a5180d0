//! The two-way decision at the heart of the agent loop.

use crate::{Message, ToolCall};

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingModel,
    AwaitingTool(Vec<ToolCall>),
    Done(String),
}

/// What the loop did at each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Model,
    Tool,
}

/// State after the model replied: tool calls go to the tool phase,
/// anything else ends the run with the reply text.
pub fn after_model(reply: &Message) -> LoopState {
    let calls = reply.requested_tools();
    if calls.is_empty() {
        LoopState::Done(reply.content.clone().unwrap_or_default())
    } else {
        LoopState::AwaitingTool(calls.to_vec())
    }
}

/// The tool phase always hands back to the model.
pub fn after_tools() -> LoopState {
    LoopState::AwaitingModel
}

/// True when no two tool phases are adjacent and the trace starts and ends
/// with a model turn.
pub fn is_well_formed(phases: &[Phase]) -> bool {
    phases.first() == Some(&Phase::Model)
        && phases.last() == Some(&Phase::Model)
        && phases.windows(2).all(|w| !(w[0] == Phase::Tool && w[1] == Phase::Tool))
}
