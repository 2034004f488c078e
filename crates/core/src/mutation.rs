// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations awaiting confirmation by the remote store.
//!
//! Every local change that could not be confirmed immediately becomes a
//! [`QueueEntry`]: the kind of mutation, a snapshot of the record it targets,
//! when it was queued, and how many flush rounds it has failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::Record;

/// The kind of mutation a queue entry replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }

    /// Returns true if the mutation needs its target to still exist locally.
    pub fn targets_existing(&self) -> bool {
        matches!(self, MutationKind::Update | MutationKind::Delete)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(MutationKind::Create),
            "update" => Ok(MutationKind::Update),
            "delete" => Ok(MutationKind::Delete),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

/// A pending mutation in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(rename = "type")]
    pub operation: MutationKind,
    /// Snapshot of the record at the time the mutation was queued.
    pub record: Record,
    pub enqueued_at: DateTime<Utc>,
    /// Failed flush rounds this entry has survived.
    #[serde(default)]
    pub retry_count: u32,
}

impl QueueEntry {
    /// Creates a fresh entry with a zero retry count.
    pub fn new(operation: MutationKind, record: Record, enqueued_at: DateTime<Utc>) -> Self {
        QueueEntry { operation, record, enqueued_at, retry_count: 0 }
    }

    /// Returns the id of the record this entry targets.
    pub fn record_id(&self) -> &str {
        &self.record.id
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
