//! The polling / processing state machine.
//!
//! One task at a time: the polling timer is disarmed the moment a task is
//! claimed and only re-armed once the cycle has ended, whatever its outcome.
//! Failures inside a cycle drop the task (at-most-once delivery). A transport
//! failure while polling disables automation and alerts the user instead of
//! retrying.

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::automation::agents::HostPageAdapter;
use crate::automation::state::{ControlCommand, CoordinatorStatus, ProcessingState, StatusSink};
use crate::automation::submitter::PromptSubmitter;
use crate::automation::watcher::CompletionWatcher;
use crate::client::TaskSource;
use crate::config::{Settings, Timing};
use crate::convert;
use crate::error::{RelayError, RelayResult};
use crate::models::{Task, TaskId};

pub const CONNECTION_ALERT: &str =
    "Failed to connect to the task server. Check the settings and re-enable the script.";

/// What one timer firing amounted to.
#[derive(Debug)]
pub enum TickOutcome {
    /// Disabled, or a task was already in flight.
    Skipped,
    NoTask,
    /// The server could not be reached; automation is now off.
    Disabled(RelayError),
    Cycle(CycleOutcome),
}

#[derive(Debug)]
pub enum CycleOutcome {
    Reported { task_id: TaskId, text: String },
    /// The text was produced but the report never reached the server.
    ReportFailed { task_id: TaskId, error: RelayError },
    Dropped { task_id: TaskId, error: RelayError },
}

pub struct TaskCoordinator<S, P, N> {
    source: S,
    page: P,
    sink: N,
    settings: Settings,
    submitter: PromptSubmitter,
    watcher: CompletionWatcher,
    state: ProcessingState,
    timer: Option<Interval>,
}

impl<S, P, N> TaskCoordinator<S, P, N>
where
    S: TaskSource,
    P: HostPageAdapter,
    N: StatusSink,
{
    pub fn new(settings: Settings, timing: Timing, source: S, page: P, sink: N) -> Self {
        Self {
            source,
            page,
            sink,
            settings,
            submitter: PromptSubmitter::new(timing.input_settle()),
            watcher: CompletionWatcher::new(
                timing.completion_settle(),
                timing.completion_timeout(),
                timing.completion_poll(),
            ),
            state: ProcessingState::Idle,
            timer: None,
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: self.state,
            enabled: self.settings.enabled,
            polling: self.is_polling(),
            polling_interval_ms: self.settings.polling_interval_ms,
            server_url: self.settings.server_url.clone(),
        }
    }

    fn transition(&mut self, next: ProcessingState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "state transition");
        }
        self.state = next;
        let status = self.status();
        self.sink.state_changed(&status);
    }

    /// Arms the polling timer when enabled. Any previous timer is dropped
    /// first, so there is never more than one. Also ends a cycle: the state
    /// moves straight from the in-flight step to `Polling` or `Idle`.
    pub fn start(&mut self) {
        self.timer = None;
        if self.settings.enabled {
            let period = self.settings.polling_interval();
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timer = Some(timer);
            info!(interval_ms = self.settings.polling_interval_ms, "polling started");
            self.transition(ProcessingState::Polling);
        } else {
            info!("polling is disabled");
            self.transition(ProcessingState::Idle);
        }
    }

    /// Disarms the timer. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let was_polling = self.timer.take().is_some();
        if was_polling {
            info!("polling stopped");
        }
        if !self.state.is_in_flight() && self.state != ProcessingState::Idle {
            self.transition(ProcessingState::Idle);
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Replaces the settings and restarts polling with the new period. The
    /// tick already scheduled under the old period is discarded, not reshaped.
    pub fn apply_settings(&mut self, settings: Settings) -> RelayResult<()> {
        settings.validate()?;
        self.settings = settings;
        self.start();
        Ok(())
    }

    /// One timer firing.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.state.is_in_flight() || !self.settings.enabled {
            return TickOutcome::Skipped;
        }

        debug!(server = %self.settings.server_url, "checking for new task");
        match self.source.fetch_task(&self.settings.server_url).await {
            Ok(None) => TickOutcome::NoTask,
            Ok(Some(task)) => TickOutcome::Cycle(self.run_cycle(task).await),
            Err(e @ RelayError::Transport(_)) => {
                error!(server = %self.settings.server_url, error = %e, "could not reach task server");
                self.settings.enabled = false;
                self.stop();
                self.sink.enabled_changed(false);
                self.sink.alert(CONNECTION_ALERT);
                TickOutcome::Disabled(e)
            }
            Err(e) => {
                warn!(server = %self.settings.server_url, error = %e, "unusable task response, treating as no task");
                TickOutcome::NoTask
            }
        }
    }

    async fn run_cycle(&mut self, task: Task) -> CycleOutcome {
        info!(task_id = %task.id, prompt = %preview(&task.prompt), "new task found");
        self.timer = None;
        self.transition(ProcessingState::Submitting);

        let outcome = self.process(task).await;
        match &outcome {
            CycleOutcome::Reported { task_id, .. } => info!(%task_id, "response sent to server"),
            CycleOutcome::ReportFailed { task_id, error } => {
                warn!(%task_id, %error, "failed to send response")
            }
            CycleOutcome::Dropped { task_id, error } if error.is_cycle_abort() => {
                warn!(%task_id, %error, "task dropped")
            }
            CycleOutcome::Dropped { task_id, error } => error!(%task_id, %error, "task dropped"),
        }

        self.start();
        outcome
    }

    async fn process(&mut self, task: Task) -> CycleOutcome {
        let Task { id: task_id, prompt } = task;

        if let Err(error) = self.submitter.submit(&self.page, &prompt).await {
            return CycleOutcome::Dropped { task_id, error };
        }

        self.transition(ProcessingState::AwaitingCompletion);
        info!(%task_id, "waiting for reply");
        let markup = match self.watcher.await_reply(&self.page).await {
            Ok(markup) => markup,
            Err(error) => return CycleOutcome::Dropped { task_id, error },
        };

        self.transition(ProcessingState::Converting);
        let text = convert::to_markdown(markup.as_html());
        debug!(%task_id, chars = text.chars().count(), "reply converted");

        self.transition(ProcessingState::Reporting);
        match self
            .source
            .report_result(&self.settings.server_url, &task_id, &text)
            .await
        {
            Ok(_) => CycleOutcome::Reported { task_id, text },
            Err(error) => CycleOutcome::ReportFailed { task_id, error },
        }
    }

    fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Enable => {
                self.set_enabled(true);
                self.sink.enabled_changed(true);
            }
            ControlCommand::Disable => {
                self.set_enabled(false);
                self.sink.enabled_changed(false);
            }
            ControlCommand::UpdateSettings { settings, reply } => {
                let enabled = settings.enabled;
                let result = self.apply_settings(settings);
                if result.is_ok() {
                    self.sink.enabled_changed(enabled);
                }
                let _ = reply.send(result);
            }
            ControlCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            ControlCommand::Shutdown => return false,
        }
        true
    }

    /// Event loop. Starts polling if enabled, then serves timer ticks and
    /// control commands until shut down or every handle is dropped.
    pub async fn run(mut self, mut control: mpsc::Receiver<ControlCommand>) -> Self {
        self.start();
        loop {
            tokio::select! {
                command = control.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = next_tick(&mut self.timer) => {
                    self.tick().await;
                }
            }
        }
        self.stop();
        info!("coordinator stopped");
        self
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
