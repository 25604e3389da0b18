//! API error types.

/// Errors from the ThunderDrive session.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered 200 but the body says the call failed.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("no XSRF-TOKEN cookie in session")]
    MissingXsrfToken,

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}
