// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change notifications pushed by the remote store.
//!
//! The remote store broadcasts one [`ChangeEvent`] per committed row change.
//! Events arrive independently of any sync the client started.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::Record;

/// What happened to the record on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Returns the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            _ => Err(Error::InvalidEventType(s.to_string())),
        }
    }
}

/// A single pushed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub event_type: ChangeKind,
    /// The new row for inserts and updates, the old row for deletes.
    pub record: Record,
}

impl ChangeEvent {
    /// Creates an insert event.
    pub fn insert(record: Record) -> Self {
        ChangeEvent { event_type: ChangeKind::Insert, record }
    }

    /// Creates an update event.
    pub fn update(record: Record) -> Self {
        ChangeEvent { event_type: ChangeKind::Update, record }
    }

    /// Creates a delete event.
    pub fn delete(record: Record) -> Self {
        ChangeEvent { event_type: ChangeKind::Delete, record }
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the event from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
