use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use cambist_shared::a2a::Task;

/// Tasks by id, kept for the process lifetime.
#[derive(Default)]
pub struct TaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl TaskStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn save(&self, task: &Task) {
        self.lock().insert(task.id.clone(), task.clone());
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().get(id).cloned()
    }
}
