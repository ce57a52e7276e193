pub mod shared;

pub use shared::{ControlCommand, CoordinatorHandle};

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Idle,
    Polling,
    Submitting,
    AwaitingCompletion,
    Converting,
    Reporting,
}

impl ProcessingState {
    /// True while a task is attached to the machine.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ProcessingState::Submitting
                | ProcessingState::AwaitingCompletion
                | ProcessingState::Converting
                | ProcessingState::Reporting
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub state: ProcessingState,
    pub enabled: bool,
    pub polling: bool,
    pub polling_interval_ms: u64,
    pub server_url: String,
}

/// UI-facing side of the coordinator, normally the settings panel.
pub trait StatusSink: Send + Sync {
    fn enabled_changed(&self, enabled: bool);

    /// User-visible alert. Only raised when the task server is unreachable.
    fn alert(&self, message: &str);

    fn state_changed(&self, _status: &CoordinatorStatus) {}
}

/// Sink for headless runs: everything lands in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn enabled_changed(&self, enabled: bool) {
        info!(enabled, "automation toggled");
    }

    fn alert(&self, message: &str) {
        warn!(alert = message, "user alert");
    }
}
