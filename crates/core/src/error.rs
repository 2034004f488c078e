// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tally-core operations.

use thiserror::Error;

/// All possible errors that can occur in tally-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid priority: '{0}'\n  hint: valid priorities are: low, medium, high")]
    InvalidPriority(String),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: create, update, delete")]
    InvalidOperation(String),

    #[error("invalid change event: '{0}'\n  hint: valid events are: insert, update, delete")]
    InvalidEventType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tally-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
