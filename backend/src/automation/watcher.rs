use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::automation::agents::{HostPageAdapter, ReplyMarkup};
use crate::error::{RelayError, RelayResult};

/// Hidden-then-visible detector for the ready-for-input indicator.
///
/// An indicator that is already visible when watching starts does not count:
/// it has to be seen hidden first. Fires at most once.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletionEdge {
    saw_hidden: bool,
    fired: bool,
}

impl CompletionEdge {
    /// Feeds one sample. Returns true only for the sample that completes the
    /// first hidden to visible transition.
    pub fn observe(&mut self, visible: bool) -> bool {
        if self.fired {
            return false;
        }
        if !visible {
            self.saw_hidden = true;
            return false;
        }
        if self.saw_hidden {
            self.fired = true;
        }
        self.fired
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Waits for the page to signal a finished reply, then hands back its markup.
///
/// With `limit` unset the wait is unbounded, which matches how the page
/// script behaved but can park the relay forever if the indicator never
/// flips. The shipped default bounds it.
#[derive(Debug, Clone, Copy)]
pub struct CompletionWatcher {
    settle: Duration,
    limit: Option<Duration>,
    poll: Duration,
}

impl CompletionWatcher {
    pub fn new(settle: Duration, limit: Option<Duration>, poll: Duration) -> Self {
        Self { settle, limit, poll }
    }

    pub async fn await_reply<P: HostPageAdapter>(&self, page: &P) -> RelayResult<ReplyMarkup> {
        match self.limit {
            Some(limit) => timeout(limit, self.await_completion(page))
                .await
                .map_err(|_| RelayError::CompletionTimeout(limit))??,
            None => self.await_completion(page).await?,
        }
        debug!("completion signal observed");

        // Trailing DOM updates land after the indicator flips.
        sleep(self.settle).await;

        page.read_latest_reply()
            .await?
            .ok_or_else(|| RelayError::ContentNotFound("no reply element after completion".into()))
    }

    /// Samples the indicator until it goes hidden to visible. Sampling stops
    /// on the firing read.
    async fn await_completion<P: HostPageAdapter>(&self, page: &P) -> RelayResult<()> {
        let mut edge = CompletionEdge::default();
        loop {
            if edge.observe(page.indicator_visible().await?) {
                return Ok(());
            }
            sleep(self.poll).await;
        }
    }
}
