mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autoresponder::automation::{CycleOutcome, TaskCoordinator, TickOutcome};
use autoresponder::client::{TaskClient, TaskSource};
use autoresponder::config::{Settings, Timing};
use autoresponder::error::RelayError;
use autoresponder::models::TaskId;
use autoresponder::prompt_client::PromptClient;
use autoresponder::queue::TaskQueue;
use autoresponder::{router, DEFAULT_ALLOWED_ORIGIN};
use reqwest::StatusCode;

use support::{FakePage, RecordingSink};

async fn spawn_server() -> (String, Arc<TaskQueue>) {
    let queue = Arc::new(TaskQueue::new());
    let app = router(queue.clone(), &[DEFAULT_ALLOWED_ORIGIN.to_string()]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), queue)
}

#[tokio::test]
async fn prompt_travels_through_queue_and_back() {
    let (api, queue) = spawn_server().await;
    let http = reqwest::Client::new();
    let requester = PromptClient::new(http.clone(), api.clone());
    let relay = TaskClient::new(http);

    let task_id = requester.send_prompt("hello").await.unwrap();
    assert_eq!(queue.pending_len(), 1);
    assert_eq!(requester.get_response(&task_id).await.unwrap().status, "pending");

    let task = relay.fetch_task(&api).await.unwrap().unwrap();
    assert_eq!(task.id, task_id);
    assert_eq!(task.prompt, "hello");
    assert!(relay.fetch_task(&api).await.unwrap().is_none());
    assert_eq!(requester.get_response(&task_id).await.unwrap().status, "processing");

    let ack = relay.report_result(&api, &task_id, "**answer**").await.unwrap();
    assert_eq!(ack.status, StatusCode::OK);

    let response = requester
        .wait_for_response(&task_id, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(response, "**answer**");
}

#[tokio::test]
async fn rejected_reports_surface_as_status_codes() {
    let (api, _queue) = spawn_server().await;
    let http = reqwest::Client::new();
    let requester = PromptClient::new(http.clone(), api.clone());
    let relay = TaskClient::new(http);

    let ghost = TaskId::new("ghost");
    let ack = relay.report_result(&api, &ghost, "x").await.unwrap();
    assert_eq!(ack.status, StatusCode::NOT_FOUND);

    let task_id = requester.send_prompt("hi").await.unwrap();
    let early = relay.report_result(&api, &task_id, "too soon").await.unwrap();
    assert_eq!(early.status, StatusCode::CONFLICT);

    relay.fetch_task(&api).await.unwrap();
    assert_eq!(relay.report_result(&api, &task_id, "ok").await.unwrap().status, StatusCode::OK);
    assert_eq!(
        relay.report_result(&api, &task_id, "again").await.unwrap().status,
        StatusCode::CONFLICT
    );

    let err = requester.get_response(&ghost).await.unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

#[tokio::test]
async fn health_route_and_cors() {
    let (api, _queue) = spawn_server().await;
    let base = api.trim_end_matches("/api");
    let http = reqwest::Client::new();

    let body: serde_json::Value = http.get(format!("{}/", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["message"], "Gemini Automation Server is running.");

    let allowed = http
        .get(format!("{}/get_prompt", api))
        .header("Origin", DEFAULT_ALLOWED_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed.headers().get("access-control-allow-origin").unwrap(),
        DEFAULT_ALLOWED_ORIGIN
    );
    let empty: serde_json::Value = allowed.json().await.unwrap();
    assert!(empty["task_id"].is_null());
    assert!(empty["prompt"].is_null());

    let foreign = http
        .get(format!("{}/get_prompt", api))
        .header("Origin", "https://example.com")
        .send()
        .await
        .unwrap();
    assert!(foreign.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn relay_cycle_against_live_queue() {
    let (api, queue) = spawn_server().await;
    let task_id = queue.enqueue("hi");

    let sink = RecordingSink::default();
    let settings = Settings { enabled: true, server_url: api.clone(), polling_interval_ms: 100 };
    let timing = Timing { input_settle_ms: 0, completion_settle_ms: 0, completion_poll_ms: 10, ..Timing::default() };
    let mut coordinator = TaskCoordinator::new(
        settings,
        timing,
        TaskClient::from_timing(&timing).unwrap(),
        FakePage::replying("<h2>Done</h2>"),
        sink.clone(),
    );
    coordinator.start();

    assert!(matches!(
        coordinator.tick().await,
        TickOutcome::Cycle(CycleOutcome::Reported { .. })
    ));
    let view = queue.status(&task_id).unwrap();
    assert_eq!(view.status, "completed");
    assert_eq!(view.response.as_deref(), Some("\n## Done\n"));
}

#[tokio::test]
async fn closed_port_disables_relay() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = RecordingSink::default();
    let settings = Settings { enabled: true, server_url: format!("http://{}/api", addr), polling_interval_ms: 100 };
    let mut coordinator = TaskCoordinator::new(
        settings,
        Timing::default(),
        TaskClient::from_timing(&Timing::default()).unwrap(),
        FakePage::replying("<p>x</p>"),
        sink.clone(),
    );
    coordinator.start();

    match coordinator.tick().await {
        TickOutcome::Disabled(RelayError::Transport(_)) => {}
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!coordinator.settings().enabled);
    assert!(!coordinator.is_polling());
    assert_eq!(sink.alerts().len(), 1);
}

#[tokio::test]
async fn silent_server_times_out_and_disables_relay() {
    // Connections complete through the listen backlog but nothing ever answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let sink = RecordingSink::default();
    let settings = Settings { enabled: true, server_url: format!("http://{}/api", addr), polling_interval_ms: 100 };
    let timing = Timing { request_timeout_secs: 1, ..Timing::default() };
    let mut coordinator = TaskCoordinator::new(
        settings,
        timing,
        TaskClient::from_timing(&timing).unwrap(),
        FakePage::replying("<p>x</p>"),
        sink.clone(),
    );
    coordinator.start();

    let outcome = tokio::time::timeout(Duration::from_secs(10), coordinator.tick())
        .await
        .expect("tick should be bounded by the request timeout");
    match outcome {
        TickOutcome::Disabled(RelayError::Transport(e)) => assert!(e.is_timeout()),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!coordinator.settings().enabled);
    assert_eq!(sink.alerts().len(), 1);
    drop(listener);
}
