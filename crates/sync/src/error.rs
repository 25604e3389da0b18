//! Transfer error taxonomy.

use thunderdrive_api::ApiError;
use thunderdrive_transfer::StallDetected;

/// Errors produced while talking to the drive or moving a file.
///
/// Every variant is retryable at the retry boundary; `Auth` is only
/// produced by [`DriveError::from_login`] and ends the run once the login
/// retries are used up.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("transport error: {0}")]
    Transport(#[from] ApiError),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A restart of the running transfer was requested.
    #[error("cancelled: restart requested")]
    Cancelled,

    #[error(transparent)]
    Stall(#[from] StallDetected),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Maps a login failure: a rejected login is an authentication error,
    /// anything else is transport trouble.
    pub fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::Rejected(reason) => Self::Auth(reason),
            other => Self::Transport(other),
        }
    }
}
