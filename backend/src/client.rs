use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::Timing;
use crate::error::RelayResult;
use crate::models::{PromptEnvelope, ResponseSubmission, Task, TaskId};

/// Joins a server base URL and an endpoint name without doubling slashes.
pub fn endpoint(server_url: &str, path: &str) -> String {
    format!("{}/{}", server_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Server acknowledgement of a reported result. Only the status is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportAck {
    pub status: StatusCode,
}

/// The two calls the coordinator makes against the task server.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// `Ok(None)` covers both an empty queue and an unparseable body.
    async fn fetch_task(&self, server_url: &str) -> RelayResult<Option<Task>>;

    async fn report_result(&self, server_url: &str, task_id: &TaskId, text: &str) -> RelayResult<ReportAck>;
}

/// HTTP client for task-server calls, bounded by `timing.request_timeout`.
/// A server that accepts the connection but never answers surfaces as a
/// transport error instead of stalling the poll loop.
pub fn http_client(timing: &Timing) -> RelayResult<Client> {
    let mut builder = Client::builder();
    if let Some(limit) = timing.request_timeout() {
        builder = builder.timeout(limit);
    }
    Ok(builder.build()?)
}

#[derive(Clone)]
pub struct TaskClient {
    http: Client,
}

impl TaskClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub fn from_timing(timing: &Timing) -> RelayResult<Self> {
        Ok(Self::new(http_client(timing)?))
    }
}

/// Interprets a `get_prompt` body. Malformed JSON is logged and read as "no task".
pub fn parse_task(body: &str) -> Option<Task> {
    match serde_json::from_str::<PromptEnvelope>(body) {
        Ok(envelope) => envelope.into_task(),
        Err(e) => {
            warn!(error = %e, "failed to parse task server response");
            None
        }
    }
}

#[async_trait]
impl TaskSource for TaskClient {
    async fn fetch_task(&self, server_url: &str) -> RelayResult<Option<Task>> {
        let resp = self.http.get(endpoint(server_url, "get_prompt")).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            debug!(%status, "task server answered with non-success status");
        }
        Ok(parse_task(&body))
    }

    async fn report_result(&self, server_url: &str, task_id: &TaskId, text: &str) -> RelayResult<ReportAck> {
        let submission = ResponseSubmission {
            response: text.to_string(),
            task_id: task_id.clone(),
        };
        let resp = self
            .http
            .post(endpoint(server_url, "receive_response"))
            .json(&submission)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%task_id, %status, "task server rejected result");
        }
        Ok(ReportAck { status })
    }
}
