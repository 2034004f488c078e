// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-record conflict resolution between local and remote state.
//!
//! Resolution rules:
//! - Only local: keep the local record
//! - Only remote: adopt the remote record
//! - Both: last effective timestamp wins, remote wins ties
//!
//! There are no vector clocks and no field-level merge. When both sides
//! edited different fields, the losing side's edit is discarded entirely.

use std::collections::{HashMap, HashSet};

use crate::record::Record;

/// Trait for reconciling two versions of the record set.
///
/// Implementations must be pure: the inputs are borrowed and the returned set
/// is freshly built.
pub trait Resolve: Send + Sync {
    /// Returns the reconciled record set.
    fn resolve(&self, local: &[Record], remote: &[Record]) -> Vec<Record>;
}

/// Last-write-wins on the effective timestamp, remote winning ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriteWins;

impl Resolve for LastWriteWins {
    fn resolve(&self, local: &[Record], remote: &[Record]) -> Vec<Record> {
        resolve(local, remote)
    }
}

/// Resolves `local` against `remote` with [`LastWriteWins`] rules.
///
/// Output order is the remote order (with the winning version of each
/// record) followed by local-only records in local order.
pub fn resolve(local: &[Record], remote: &[Record]) -> Vec<Record> {
    let local_by_id: HashMap<&str, &Record> = local.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(remote.len());
    let mut resolved = Vec::with_capacity(local.len().max(remote.len()));

    for theirs in remote {
        if !seen.insert(theirs.id.as_str()) {
            continue;
        }
        let winner = match local_by_id.get(theirs.id.as_str()) {
            Some(ours) => pick(ours, theirs),
            None => theirs,
        };
        resolved.push(winner.clone());
    }

    for ours in local {
        if seen.insert(ours.id.as_str()) {
            resolved.push(ours.clone());
        }
    }

    resolved
}

/// Picks the winning version of a record present on both sides.
pub fn pick<'a>(local: &'a Record, remote: &'a Record) -> &'a Record {
    if remote.effective_timestamp() >= local.effective_timestamp() {
        remote
    } else {
        local
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
