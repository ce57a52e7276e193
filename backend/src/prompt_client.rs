use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::client::endpoint;
use crate::error::{RelayError, RelayResult};
use crate::models::{SendPromptAccepted, SendPromptRequest, TaskId, TaskStatus, TaskStatusView};

/// Requester side of the task queue: enqueue a prompt, then poll for its answer.
#[derive(Clone)]
pub struct PromptClient {
    http: Client,
    api_base: String,
}

impl PromptClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self { http, api_base: api_base.into() }
    }

    pub async fn send_prompt(&self, text: &str) -> RelayResult<TaskId> {
        let accepted: SendPromptAccepted = self
            .http
            .post(endpoint(&self.api_base, "send_prompt"))
            .json(&SendPromptRequest { text: text.to_string() })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        accepted
            .task_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| RelayError::MalformedResponse("server returned no task id".into()))
    }

    pub async fn get_response(&self, task_id: &TaskId) -> RelayResult<TaskStatusView> {
        let view = self
            .http
            .get(endpoint(&self.api_base, &format!("get_response/{}", task_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(view)
    }

    /// Polls until the task completes. Any status other than pending or
    /// processing ends the wait with an error.
    pub async fn wait_for_response(&self, task_id: &TaskId, every: Duration) -> RelayResult<String> {
        loop {
            let view = self.get_response(task_id).await?;
            match view.status.as_str() {
                s if s == TaskStatus::Completed.as_str() => {
                    return Ok(view.response.unwrap_or_default());
                }
                s if s == TaskStatus::Pending.as_str() || s == TaskStatus::Processing.as_str() => {
                    debug!(%task_id, status = s, "waiting for response");
                    sleep(every).await;
                }
                other => return Err(RelayError::UnexpectedStatus(other.to_string())),
            }
        }
    }
}
