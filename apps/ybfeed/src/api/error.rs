use reqwest::StatusCode;
use thiserror::Error;

/// Classified outcome of a feed API call. Raw transport errors never leave
/// this module; callers branch on these variants only.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401: the caller holds no usable secret. Recoverable through the
    /// PIN prompt, never fatal.
    #[error("unauthorized")]
    Unauthorized,
    /// Any other non-2xx response, with the best-effort message body.
    #[error("server responded {status}: {message}")]
    Server { status: StatusCode, message: String },
    /// The server could not be reached at all.
    #[error("server unavailable")]
    Unavailable(#[source] reqwest::Error),
    /// A 2xx response that did not carry what it should have.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
