// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-sync - Offline-first synchronization for tally task lists.
//!
//! Local edits apply immediately and survive restarts. The engine pushes
//! them to a remote store when it can and queues them when it cannot, then
//! reconciles everything on reconnect.
//!
//! # Main Components
//!
//! - [`SyncEngine`] - Owns local records, the offline queue and sync metadata
//! - [`NetworkMonitor`] - Connectivity flag with transition listeners
//! - [`MutationQueue`] - Ordered pending mutations with a retry ceiling
//! - [`RemoteStore`] / [`LocalCache`] - Seams to the backend and to disk
//! - [`SyncConfig`] - `config.toml` settings
//! - [`SyncError`] - Error types for all operations
//!
//! # Architecture
//!
//! ```text
//!  user edit ──► SyncEngine ──► LocalCache (write-through)
//!                    │
//!          online? ──┼── yes ──► RemoteStore::create/update/delete
//!                    │
//!                    └── no ───► MutationQueue
//!
//!  NetworkMonitor: offline ──► online
//!                    │ settle delay
//!                    ▼
//!          process_sync_queue ──► batch_apply ──► sync_todos
//!
//!  RemoteStore change feed ──► realtime::apply ──► local records
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_sync::{FileCache, NetworkMonitor, SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::load_or_default(&dir)?;
//! let cache = FileCache::new(config.cache_path(&dir));
//! let monitor = NetworkMonitor::new(true);
//! let engine = Arc::new(SyncEngine::new(remote, cache, monitor.clone(), config)?);
//! engine.start()?;
//!
//! engine.add_todo("Buy milk", Priority::Medium).await;
//! monitor.set_online(false);
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod network;
pub mod queue;
pub mod realtime;
pub mod remote;

pub use cache::{FileCache, LocalCache, MemoryCache, PersistedState};
pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncMetadata};
pub use error::{Result, SyncError};
pub use network::{NetworkMonitor, NetworkStatus, Subscription};
pub use queue::MutationQueue;
pub use realtime::ChangeOutcome;
pub use remote::{RemoteError, RemoteFuture, RemoteResult, RemoteStore};

#[cfg(test)]
mod test_helpers;
