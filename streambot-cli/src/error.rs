use thiserror::Error;

/// Shown when a failure carries no usable text of its own.
pub const FALLBACK_ERROR: &str = "Request failed";

#[derive(Debug, Error)]
pub enum StreamError {
    /// Non-success status, or a success status without a body to read.
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The cancellation handle fired while the request was pending.
    #[error("request aborted")]
    Aborted,
}

impl StreamError {
    pub(crate) fn request_failed(status: reqwest::StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            body
        };
        Self::RequestFailed {
            status: status.as_u16(),
            message,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            text
        }
    }
}
