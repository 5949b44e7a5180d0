pub mod a2a;
pub mod events;
pub mod macros;
pub mod registry;
pub mod schemas;
pub mod toolbelts;

pub use async_trait::async_trait;
pub use once_cell;

pub use events::AgentEvent;
pub use registry::toolbelts;
pub use schemas::{ParameterSchema, Tool, ToolError, ToolSchema, Toolbelt};
