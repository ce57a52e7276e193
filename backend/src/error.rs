use thiserror::Error;

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The task server could not be reached or the exchange broke mid-flight.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed server response: {0}")]
    MalformedResponse(String),
    #[error("host page element not found: {0}")]
    TargetNotFound(String),
    #[error("reply content not found: {0}")]
    ContentNotFound(String),
    #[error("completion signal not observed within {0:?}")]
    CompletionTimeout(std::time::Duration),
    #[error("browser automation failed: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unexpected task status: {0}")]
    UnexpectedStatus(String),
}

impl RelayError {
    /// Errors that abort the current task and send the coordinator back to polling.
    pub fn is_cycle_abort(&self) -> bool {
        matches!(
            self,
            RelayError::TargetNotFound(_)
                | RelayError::ContentNotFound(_)
                | RelayError::CompletionTimeout(_)
                | RelayError::Browser(_)
        )
    }
}
