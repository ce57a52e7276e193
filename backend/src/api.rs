use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{PromptEnvelope, ReceiveAck, ResponseSubmission, SendPromptAccepted, SendPromptRequest, TaskId};
use crate::queue::{QueueError, TaskQueue};

pub type SharedQueue = Arc<TaskQueue>;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Gemini Automation Server is running." }))
}

pub async fn send_prompt(
    State(queue): State<SharedQueue>,
    Json(request): Json<SendPromptRequest>,
) -> impl IntoResponse {
    let task_id = queue.enqueue(request.text);
    info!(%task_id, "new task created");
    (StatusCode::ACCEPTED, Json(SendPromptAccepted { task_id: Some(task_id) }))
}

pub async fn get_prompt(State(queue): State<SharedQueue>) -> impl IntoResponse {
    match queue.claim_next() {
        Some((task_id, prompt)) => {
            let waited_ms = queue
                .created_at(&task_id)
                .map(|created| (Utc::now() - created).num_milliseconds())
                .unwrap_or_default();
            info!(%task_id, waited_ms, "task picked up by relay");
            Json(PromptEnvelope::for_task(&task_id, &prompt))
        }
        None => Json(PromptEnvelope::empty()),
    }
}

pub async fn receive_response(
    State(queue): State<SharedQueue>,
    Json(submission): Json<ResponseSubmission>,
) -> impl IntoResponse {
    let task_id = submission.task_id;
    match queue.complete(&task_id, submission.response) {
        Ok(()) => {
            info!(%task_id, "task completed");
            (
                StatusCode::OK,
                Json(ReceiveAck {
                    status: "success".into(),
                    message: format!("Task {} has been completed.", task_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(%task_id, error = %e, "rejected response");
            error_response(e)
        }
    }
}

pub async fn get_response(
    State(queue): State<SharedQueue>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let task_id = TaskId(task_id);
    match queue.status(&task_id) {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => error_response(QueueError::NotFound(task_id)),
    }
}

fn error_response(err: QueueError) -> axum::response::Response {
    let status = match err {
        QueueError::NotFound(_) => StatusCode::NOT_FOUND,
        QueueError::NotProcessing(_) => StatusCode::CONFLICT,
    };
    (status, Json(json!({ "detail": err.to_string() }))).into_response()
}
