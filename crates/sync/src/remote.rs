// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store abstraction.
//!
//! The sync engine never speaks a wire protocol itself. It drives a
//! [`RemoteStore`], which lets the real backend client and the in-memory
//! test double share one seam.

use std::future::Future;
use std::pin::Pin;

use tally_core::{ChangeEvent, QueueEntry, Record};
use tokio::sync::mpsc;

/// Error type for remote store calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Network or backend failure. Worth retrying later.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// No valid session.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The backend refused the payload. Retrying will not change the outcome.
    #[error("validation rejected: {0}")]
    ValidationRejected(String),
}

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteStore`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// The authoritative record store.
///
/// Every method that returns a [`RemoteFuture`] is a suspension point for
/// the engine.
pub trait RemoteStore: Send + Sync {
    /// Returns true if a session is available for authenticated calls.
    fn is_session_available(&self) -> bool;

    /// Lists every record visible to the session.
    fn list_records(&self) -> RemoteFuture<'_, Vec<Record>>;

    /// Creates a record, returning it with the server-assigned id and
    /// authoritative timestamps.
    fn create_record(&self, record: &Record) -> RemoteFuture<'_, Record>;

    /// Updates the record with the given id, returning the confirmed row.
    fn update_record(&self, id: &str, record: &Record) -> RemoteFuture<'_, Record>;

    /// Deletes the record with the given id.
    fn delete_record(&self, id: &str) -> RemoteFuture<'_, ()>;

    /// Applies a batch of queued mutations in one call.
    fn batch_apply(&self, entries: Vec<QueueEntry>) -> RemoteFuture<'_, ()>;

    /// Takes the push channel for change notifications, if the store has one.
    ///
    /// Called once by [`SyncEngine::start`](crate::SyncEngine::start).
    fn change_feed(&self) -> Option<mpsc::UnboundedReceiver<ChangeEvent>> {
        None
    }
}
