#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use autoresponder::automation::agents::{HostPageAdapter, ReplyMarkup};
use autoresponder::automation::{CoordinatorStatus, ProcessingState, StatusSink};
use autoresponder::client::{ReportAck, TaskSource};
use autoresponder::error::{RelayError, RelayResult};
use autoresponder::models::{Task, TaskId};

pub fn task(id: &str, prompt: &str) -> Task {
    Task { id: TaskId::new(id), prompt: prompt.to_string() }
}

#[derive(Debug)]
struct PageState {
    has_input: bool,
    has_submit: bool,
    submit_enabled: bool,
    /// Visibility readings served in order; `indicator_rest` once drained.
    indicator: VecDeque<bool>,
    indicator_rest: bool,
    reply: Option<String>,
    written: Vec<String>,
    clicks: usize,
    indicator_reads: usize,
}

/// In-memory host page. Clones share state so a test can inspect it after
/// handing one to the coordinator.
#[derive(Debug, Clone)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn replying(html: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                has_input: true,
                has_submit: true,
                submit_enabled: true,
                // Hidden while generating, visible again on the next read.
                indicator: VecDeque::from([false]),
                indicator_rest: true,
                reply: Some(html.to_string()),
                written: Vec::new(),
                clicks: 0,
                indicator_reads: 0,
            })),
        }
    }

    pub fn without_input(self) -> Self {
        self.state.lock().unwrap().has_input = false;
        self
    }

    pub fn without_submit(self) -> Self {
        self.state.lock().unwrap().has_submit = false;
        self
    }

    pub fn with_disabled_submit(self) -> Self {
        self.state.lock().unwrap().submit_enabled = false;
        self
    }

    pub fn without_reply(self) -> Self {
        self.state.lock().unwrap().reply = None;
        self
    }

    /// Scripts the indicator: `readings` in order, then `rest` forever.
    pub fn with_indicator(self, readings: impl IntoIterator<Item = bool>, rest: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.indicator = readings.into_iter().collect();
            state.indicator_rest = rest;
        }
        self
    }

    /// The indicator stays hidden, so the reply never completes.
    pub fn never_completing(self) -> Self {
        self.with_indicator([], false)
    }

    pub fn set_input_present(&self, present: bool) {
        self.state.lock().unwrap().has_input = present;
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn indicator_reads(&self) -> usize {
        self.state.lock().unwrap().indicator_reads
    }
}

#[derive(Debug)]
pub struct FakeSurface;

#[derive(Debug)]
pub struct FakeButton;

#[async_trait]
impl HostPageAdapter for FakePage {
    type InputSurface = FakeSurface;
    type SubmitControl = FakeButton;

    async fn find_input_surface(&self) -> RelayResult<Option<FakeSurface>> {
        Ok(self.state.lock().unwrap().has_input.then_some(FakeSurface))
    }

    async fn write_prompt(&self, _surface: &FakeSurface, text: &str) -> RelayResult<()> {
        self.state.lock().unwrap().written.push(text.to_string());
        Ok(())
    }

    async fn find_submit_control(&self) -> RelayResult<Option<FakeButton>> {
        Ok(self.state.lock().unwrap().has_submit.then_some(FakeButton))
    }

    async fn is_control_enabled(&self, _control: &FakeButton) -> RelayResult<bool> {
        Ok(self.state.lock().unwrap().submit_enabled)
    }

    async fn activate_control(&self, _control: &FakeButton) -> RelayResult<()> {
        self.state.lock().unwrap().clicks += 1;
        Ok(())
    }

    async fn indicator_visible(&self) -> RelayResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.indicator_reads += 1;
        let rest = state.indicator_rest;
        Ok(state.indicator.pop_front().unwrap_or(rest))
    }

    async fn read_latest_reply(&self) -> RelayResult<Option<ReplyMarkup>> {
        Ok(self.state.lock().unwrap().reply.clone().map(ReplyMarkup::new))
    }
}

#[derive(Debug)]
pub enum Fetch {
    Task(Task),
    Empty,
    /// Fails the way an unreachable server does: a transport error.
    Unreachable,
    /// A non-transport failure, such as a body that could not be used.
    Malformed,
}

/// A genuine `reqwest::Error`, produced without touching the network.
pub fn transport_error() -> RelayError {
    let err = reqwest::Client::new().get("not a url").build().unwrap_err();
    RelayError::Transport(err)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub server_url: String,
    pub task_id: TaskId,
    pub text: String,
}

#[derive(Debug, Default)]
struct SourceState {
    script: VecDeque<Fetch>,
    fetches: Vec<String>,
    reports: Vec<Report>,
    fail_reports: bool,
}

/// Task server stand-in that answers fetches from a script, then with "no task".
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<SourceState>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Fetch>) -> Self {
        let source = Self::default();
        source.state.lock().unwrap().script = script.into_iter().collect();
        source
    }

    pub fn failing_reports(self) -> Self {
        self.state.lock().unwrap().fail_reports = true;
        self
    }

    pub fn push(&self, fetch: Fetch) {
        self.state.lock().unwrap().script.push_back(fetch);
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetches.len()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.state.lock().unwrap().reports.clone()
    }
}

#[async_trait]
impl TaskSource for ScriptedSource {
    async fn fetch_task(&self, server_url: &str) -> RelayResult<Option<Task>> {
        let mut state = self.state.lock().unwrap();
        state.fetches.push(server_url.to_string());
        match state.script.pop_front() {
            Some(Fetch::Task(task)) => Ok(Some(task)),
            Some(Fetch::Empty) | None => Ok(None),
            Some(Fetch::Unreachable) => Err(transport_error()),
            Some(Fetch::Malformed) => Err(RelayError::MalformedResponse("unexpected body".into())),
        }
    }

    async fn report_result(&self, server_url: &str, task_id: &TaskId, text: &str) -> RelayResult<ReportAck> {
        let mut state = self.state.lock().unwrap();
        state.reports.push(Report {
            server_url: server_url.to_string(),
            task_id: task_id.clone(),
            text: text.to_string(),
        });
        if state.fail_reports {
            return Err(RelayError::MalformedResponse("connection reset".into()));
        }
        Ok(ReportAck { status: reqwest::StatusCode::OK })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Enabled(bool),
    Alert(String),
}

#[derive(Debug, Default)]
struct SinkState {
    events: Vec<SinkEvent>,
    statuses: Vec<CoordinatorStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Alert(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<CoordinatorStatus> {
        self.state.lock().unwrap().statuses.clone()
    }

    pub fn states(&self) -> Vec<ProcessingState> {
        self.statuses().into_iter().map(|status| status.state).collect()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.events.clear();
        state.statuses.clear();
    }
}

impl StatusSink for RecordingSink {
    fn enabled_changed(&self, enabled: bool) {
        self.state.lock().unwrap().events.push(SinkEvent::Enabled(enabled));
    }

    fn alert(&self, message: &str) {
        self.state.lock().unwrap().events.push(SinkEvent::Alert(message.to_string()));
    }

    fn state_changed(&self, status: &CoordinatorStatus) {
        self.state.lock().unwrap().statuses.push(status.clone());
    }
}
