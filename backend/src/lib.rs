pub mod api;
pub mod automation;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod models;
pub mod prompt_client;
pub mod queue;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::SharedQueue;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://gemini.google.com";

/// Task-queue routes. Only the listed origins may call them from a browser,
/// which in practice means the chat page the relay runs in.
pub fn router(queue: SharedQueue, allowed_origins: &[String]) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = if allowed_origins.iter().any(|origin| origin == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(origins)
    };

    Router::new()
        .route("/", get(api::root))
        .route("/api/send_prompt", post(api::send_prompt))
        .route("/api/get_prompt", get(api::get_prompt))
        .route("/api/receive_response", post(api::receive_response))
        .route("/api/get_response/:task_id", get(api::get_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(queue)
}

pub async fn run_server(addr: SocketAddr, queue: SharedQueue, allowed_origins: &[String]) -> std::io::Result<()> {
    let app = router(queue, allowed_origins);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "task queue server listening");
    axum::serve(listener, app).await
}
