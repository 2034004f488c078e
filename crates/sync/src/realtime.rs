// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Applies change events pushed by the remote store.
//!
//! Pushed events are the remote store's own authoritative timeline, so they
//! bypass the queue and the conflict resolver: each event overwrites local
//! state directly.
//!
//! Rules:
//! - Insert: ignored if the id is already present, otherwise appended
//! - Update: replaces the matching record wholesale, no-op if absent
//! - Delete: removes the matching record, no-op if absent

use tally_core::{ChangeEvent, ChangeKind, Record};

/// What applying an event did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Inserted,
    Updated,
    Deleted,
    /// Duplicate insert, or update/delete of an unknown record.
    Ignored,
}

impl ChangeOutcome {
    /// Returns true if local state changed.
    pub fn changed(&self) -> bool {
        !matches!(self, ChangeOutcome::Ignored)
    }
}

/// Applies one pushed event to the local record set.
pub fn apply(records: &mut Vec<Record>, event: &ChangeEvent) -> ChangeOutcome {
    let incoming = &event.record;
    let position = records.iter().position(|r| r.id == incoming.id);

    match (event.event_type, position) {
        (ChangeKind::Insert, Some(_)) => ChangeOutcome::Ignored,
        (ChangeKind::Insert, None) => {
            records.push(incoming.clone());
            ChangeOutcome::Inserted
        }
        (ChangeKind::Update, Some(i)) => {
            records[i] = incoming.clone();
            ChangeOutcome::Updated
        }
        (ChangeKind::Delete, Some(i)) => {
            records.remove(i);
            ChangeOutcome::Deleted
        }
        (ChangeKind::Update | ChangeKind::Delete, None) => ChangeOutcome::Ignored,
    }
}

#[cfg(test)]
#[path = "realtime_tests.rs"]
mod tests;
