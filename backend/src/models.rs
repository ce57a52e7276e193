use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work handed out by the task server. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub prompt: String,
}

/// Body of `GET /get_prompt`. Both fields are null when the queue is empty.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PromptEnvelope {
    #[serde(default)]
    pub task_id: Option<serde_json::Value>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl PromptEnvelope {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_task(id: &TaskId, prompt: &str) -> Self {
        Self {
            task_id: Some(serde_json::Value::String(id.0.clone())),
            prompt: Some(prompt.to_string()),
        }
    }

    /// A task is only usable when both fields are present and non-empty.
    pub fn into_task(self) -> Option<Task> {
        let id = match self.task_id? {
            serde_json::Value::String(s) if !s.is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let prompt = self.prompt.filter(|p| !p.is_empty())?;
        Some(Task { id: TaskId(id), prompt })
    }
}

/// Body of `POST /receive_response`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseSubmission {
    pub response: String,
    pub task_id: TaskId,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SendPromptRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SendPromptAccepted {
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Body of `GET /get_response/:task_id`. `status` stays a plain string so
/// clients can report values this build does not know about.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskStatusView {
    pub status: String,
    pub response: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReceiveAck {
    pub status: String,
    pub message: String,
}
