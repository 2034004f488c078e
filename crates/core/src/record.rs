// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Task records: the rows the sync engine keeps consistent.
//!
//! This module contains [`Record`], its [`Priority`], and the partial update
//! type [`RecordPatch`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Importance of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    /// Default for new tasks.
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

/// A single task item.
///
/// Serialized with camelCase keys, which is the shape the remote store speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Locally-minted placeholder (creation millis) or server-assigned id.
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// Set by the remote store once the record has been persisted there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// True until the remote store has confirmed a create for this record.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_create: bool,
}

impl Record {
    /// Creates a record that exists only locally.
    ///
    /// The identity is the creation time in milliseconds, and the record is
    /// flagged as pending creation on the remote store.
    pub fn new_local(text: impl Into<String>, priority: Priority, now_ms: u64) -> Self {
        Record {
            id: now_ms.to_string(),
            text: text.into(),
            completed: false,
            priority,
            created_at: crate::clock::from_millis(now_ms),
            updated_at: None,
            pending_create: true,
        }
    }

    /// Returns true if the remote store has never seen this record.
    pub fn is_pending_create(&self) -> bool {
        self.pending_create
    }

    /// Returns true if the user-editable fields match.
    pub fn same_content(&self, other: &Record) -> bool {
        self.text == other.text
            && self.completed == other.completed
            && self.priority == other.priority
    }

    /// The record as sent to the remote store, without local bookkeeping.
    pub fn remote_payload(&self) -> Record {
        Record { pending_create: false, ..self.clone() }
    }

    /// The timestamp used for last-write-wins comparison.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Applies a partial update, returning true if any field changed.
    pub fn apply_patch(&mut self, patch: &RecordPatch) -> bool {
        let mut changed = false;
        if let Some(text) = &patch.text {
            if *text != self.text {
                self.text = text.clone();
                changed = true;
            }
        }
        if let Some(completed) = patch.completed {
            if completed != self.completed {
                self.completed = completed;
                changed = true;
            }
        }
        if let Some(priority) = patch.priority {
            if priority != self.priority {
                self.priority = priority;
                changed = true;
            }
        }
        changed
    }
}

/// Fields a user edit may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl RecordPatch {
    pub fn text(text: impl Into<String>) -> Self {
        RecordPatch { text: Some(text.into()), ..Default::default() }
    }

    pub fn completed(completed: bool) -> Self {
        RecordPatch { completed: Some(completed), ..Default::default() }
    }

    pub fn priority(priority: Priority) -> Self {
        RecordPatch { priority: Some(priority), ..Default::default() }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
