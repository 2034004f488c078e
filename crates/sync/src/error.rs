// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::remote::RemoteError;

/// All possible errors that can occur in the tally-sync library.
///
/// The `Display` text of a sync failure is what lands in
/// [`SyncMetadata::sync_error`](crate::SyncMetadata::sync_error).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not authenticated: sign in to sync")]
    NotAuthenticated,

    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("remote store rejected the change: {0}")]
    ValidationRejected(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] tally_core::Error),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthenticated => SyncError::NotAuthenticated,
            RemoteError::Unreachable(msg) => SyncError::Unreachable(msg),
            RemoteError::ValidationRejected(msg) => SyncError::ValidationRejected(msg),
        }
    }
}

impl SyncError {
    /// Returns true if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::ValidationRejected(_) | SyncError::RecordNotFound(_))
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
