use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::Message;

/// Conversation history per session id, kept for the process lifetime.
/// Runs read a snapshot and write back on success; the last writer wins.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Vec<Message>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Message>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    pub fn store(&self, session_id: &str, history: Vec<Message>) {
        self.lock().insert(session_id.to_string(), history);
    }
}
