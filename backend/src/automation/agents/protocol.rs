use async_trait::async_trait;

use crate::error::RelayResult;

/// Inner HTML of one finished reply, as read from the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMarkup(String);

impl ReplyMarkup {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }
}

/// Everything the relay needs from the chat page. Selectors and DOM details
/// stay behind this trait so the coordinator can run against a fake page.
#[async_trait]
pub trait HostPageAdapter: Send + Sync {
    type InputSurface: Send + Sync;
    type SubmitControl: Send + Sync;

    async fn find_input_surface(&self) -> RelayResult<Option<Self::InputSurface>>;

    async fn write_prompt(&self, surface: &Self::InputSurface, text: &str) -> RelayResult<()>;

    async fn find_submit_control(&self) -> RelayResult<Option<Self::SubmitControl>>;

    async fn is_control_enabled(&self, control: &Self::SubmitControl) -> RelayResult<bool>;

    async fn activate_control(&self, control: &Self::SubmitControl) -> RelayResult<()>;

    /// One sample of the ready-for-input indicator: present and not carrying
    /// the hidden class. A missing indicator reads as hidden.
    async fn indicator_visible(&self) -> RelayResult<bool>;

    /// The most recently appended reply element, if any.
    async fn read_latest_reply(&self) -> RelayResult<Option<ReplyMarkup>>;
}
