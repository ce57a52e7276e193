use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::automation::agents::HostPageAdapter;
use crate::error::{RelayError, RelayResult};

/// Writes a prompt into the page and presses send. One attempt, no retries.
#[derive(Debug, Clone, Copy)]
pub struct PromptSubmitter {
    settle: Duration,
}

impl PromptSubmitter {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    pub async fn submit<P: HostPageAdapter>(&self, page: &P, prompt: &str) -> RelayResult<()> {
        let surface = page
            .find_input_surface()
            .await?
            .ok_or_else(|| RelayError::TargetNotFound("input surface".into()))?;
        page.write_prompt(&surface, prompt).await?;

        // The page's reactive layer needs a moment before the send button reflects the input.
        sleep(self.settle).await;

        let control = page
            .find_submit_control()
            .await?
            .ok_or_else(|| RelayError::TargetNotFound("submit control".into()))?;
        if !page.is_control_enabled(&control).await? {
            return Err(RelayError::TargetNotFound("submit control is disabled".into()));
        }
        page.activate_control(&control).await?;
        debug!(chars = prompt.chars().count(), "prompt submitted");
        Ok(())
    }
}
