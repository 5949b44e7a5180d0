pub mod a2a;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

use std::sync::Arc;

use crate::config::Config;
use crate::runtime::AgentRuntime;
use a2a::store::TaskStore;

pub use routes::create_router;
pub use server::start_server;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub config: Arc<Config>,
    pub tasks: Arc<TaskStore>,
}

impl AppState {
    pub fn new(runtime: Arc<AgentRuntime>, config: Config) -> Self {
        Self {
            runtime,
            config: Arc::new(config),
            tasks: Arc::new(TaskStore::default()),
        }
    }
}
