use tokio::sync::{mpsc, oneshot};

use crate::automation::state::CoordinatorStatus;
use crate::config::Settings;
use crate::error::{RelayError, RelayResult};

#[derive(Debug)]
pub enum ControlCommand {
    Enable,
    Disable,
    UpdateSettings { settings: Settings, reply: oneshot::Sender<RelayResult<()>> },
    Status { reply: oneshot::Sender<CoordinatorStatus> },
    Shutdown,
}

/// Cloneable front for the coordinator's event loop. Commands sent while a
/// task is in flight are applied once the cycle finishes.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<ControlCommand>,
}

impl CoordinatorHandle {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ControlCommand>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn enable(&self) -> bool {
        self.tx.send(ControlCommand::Enable).await.is_ok()
    }

    pub async fn disable(&self) -> bool {
        self.tx.send(ControlCommand::Disable).await.is_ok()
    }

    /// Validates and applies new settings, restarting the polling timer.
    pub async fn update_settings(&self, settings: Settings) -> RelayResult<()> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(ControlCommand::UpdateSettings { settings, reply: tx })
            .await
            .map_err(|_| RelayError::Config("coordinator has stopped".into()))?;
        rx.await
            .map_err(|_| RelayError::Config("coordinator dropped reply".into()))?
    }

    pub async fn status(&self) -> Option<CoordinatorStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(ControlCommand::Status { reply: tx }).await.ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(ControlCommand::Shutdown).await;
    }
}
