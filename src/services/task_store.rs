//! Task collection store

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::storage::{keys, Storage};
use crate::state::{
    task::{normalize_description, normalize_tags, normalize_title},
    NewTask, Task, TaskPatch,
};

/// Error message prefix for lookups of unknown tasks
pub const TASK_NOT_FOUND: &str = "Task not found";

/// In-memory task list written through to storage after every mutation
pub struct TaskStore {
    storage: Arc<dyn Storage>,
    tasks: RwLock<Vec<Task>>,
}

impl TaskStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Load the persisted task list; an unreadable list loads as empty
    pub async fn load(&self) -> usize {
        let tasks = match self.storage.get(keys::TASKS).await {
            Ok(Some(value)) => serde_json::from_value::<Vec<Task>>(value).unwrap_or_else(|e| {
                warn!("Failed to parse persisted tasks: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load tasks: {}", e);
                Vec::new()
            }
        };

        let count = tasks.len();
        *self.tasks.write().await = tasks;
        count
    }

    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// A task that exists and is not done
    pub async fn get_active_task(&self, id: &str) -> Option<Task> {
        self.get(id).await.filter(|t| !t.done)
    }

    /// Tasks whose title, description or tags contain `query`
    pub async fn search(&self, query: &str) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| t.matches(query))
            .cloned()
            .collect()
    }

    pub async fn add(&self, new_task: NewTask) -> Result<Task, String> {
        let title = normalize_title(&new_task.title)?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title,
            description: normalize_description(new_task.description.as_deref()),
            priority: new_task.priority,
            tags: normalize_tags(&new_task.tags),
            done: new_task.done,
            pomodoros: 0,
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write().await;
        tasks.push(task.clone());
        self.persist(&tasks).await?;
        info!("Task created: {}", task.id);
        Ok(task)
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, String> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("{}: {}", TASK_NOT_FOUND, id))?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description.as_deref() {
            task.description = normalize_description(Some(description));
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = patch.tags.as_deref() {
            task.tags = normalize_tags(tags);
        }
        if let Some(done) = patch.done {
            task.done = done;
        }
        task.updated_at = Utc::now();

        let updated = task.clone();
        self.persist(&tasks).await?;
        debug!("Task updated: {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), String> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(format!("{}: {}", TASK_NOT_FOUND, id));
        }

        self.persist(&tasks).await?;
        info!("Task deleted: {}", id);
        Ok(())
    }

    /// Add one completed pomodoro to a task
    pub async fn increment_pomodoros(&self, id: &str) -> Result<Task, String> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("{}: {}", TASK_NOT_FOUND, id))?;

        task.pomodoros += 1;
        task.updated_at = Utc::now();
        let updated = task.clone();

        self.persist(&tasks).await?;
        debug!("Task {} now has {} pomodoros", id, updated.pomodoros);
        Ok(updated)
    }

    async fn persist(&self, tasks: &[Task]) -> Result<(), String> {
        let value = serde_json::to_value(tasks)
            .map_err(|e| format!("Failed to serialize tasks: {}", e))?;
        self.storage.set(keys::TASKS, value).await
    }
}
