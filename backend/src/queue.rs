use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{TaskId, TaskStatus, TaskStatusView};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task ID {0} not found.")]
    NotFound(TaskId),
    #[error("Task is not in 'processing' state.")]
    NotProcessing(TaskId),
}

#[derive(Debug, Clone)]
struct QueuedTask {
    prompt: String,
    response: Option<String>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueInner {
    tasks: HashMap<TaskId, QueuedTask>,
    pending: VecDeque<TaskId>,
}

/// In-memory FIFO of prompts waiting for the relay. Nothing survives a restart.
#[derive(Default)]
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn enqueue(&self, prompt: impl Into<String>) -> TaskId {
        let id = TaskId(Uuid::new_v4().to_string());
        let mut inner = self.lock();
        inner.tasks.insert(
            id.clone(),
            QueuedTask {
                prompt: prompt.into(),
                response: None,
                status: TaskStatus::Pending,
                created_at: Utc::now(),
            },
        );
        inner.pending.push_back(id.clone());
        id
    }

    /// Hands out the oldest pending task and marks it processing.
    pub fn claim_next(&self) -> Option<(TaskId, String)> {
        let mut inner = self.lock();
        while let Some(id) = inner.pending.pop_front() {
            if let Some(task) = inner.tasks.get_mut(&id) {
                if task.status == TaskStatus::Pending {
                    task.status = TaskStatus::Processing;
                    return Some((id, task.prompt.clone()));
                }
            }
        }
        None
    }

    pub fn complete(&self, id: &TaskId, response: impl Into<String>) -> Result<(), QueueError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;
        if task.status != TaskStatus::Processing {
            return Err(QueueError::NotProcessing(id.clone()));
        }
        task.response = Some(response.into());
        task.status = TaskStatus::Completed;
        Ok(())
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatusView> {
        self.lock().tasks.get(id).map(|task| TaskStatusView {
            status: task.status.as_str().to_string(),
            response: task.response.clone(),
        })
    }

    pub fn created_at(&self, id: &TaskId) -> Option<DateTime<Utc>> {
        self.lock().tasks.get(id).map(|task| task.created_at)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}
