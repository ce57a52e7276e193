pub mod agents;
pub mod coordinator;
pub mod core;
pub mod state;
pub mod submitter;
pub mod watcher;

pub use coordinator::{CycleOutcome, TaskCoordinator, TickOutcome};
pub use state::{ControlCommand, CoordinatorHandle, CoordinatorStatus, LogSink, ProcessingState, StatusSink};
