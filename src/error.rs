use reqwest::StatusCode;
use thiserror::Error;

/// Failures the widget can run into while talking to its backend.
///
/// None of these escape the controller: each one ends up as a notice bubble.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// No backend origin was configured or inferable from the script URL.
    #[error("backend origin is not configured")]
    MissingOrigin,

    /// The request never produced an HTTP response.
    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend answered with status {0}")]
    Status(StatusCode),

    #[error("could not decode backend reply: {0}")]
    Decode(#[source] reqwest::Error),
}

impl WidgetError {
    /// Whether the readiness loop should keep retrying after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WidgetError::MissingOrigin)
    }
}
