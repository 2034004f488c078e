// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline mutation queue.
//!
//! Holds local changes the remote store has not confirmed yet, in the order
//! they were made. The queue is flushed as one batch; a failed batch bumps
//! every entry's retry count and drops entries past the retry ceiling so the
//! queue cannot grow without bound.

use std::collections::HashSet;

use tally_core::{MutationKind, QueueEntry, Record};

/// Default number of failed flush rounds an entry survives.
pub const DEFAULT_RETRY_CEILING: u32 = 3;

/// Ordered list of pending mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationQueue {
    entries: Vec<QueueEntry>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a queue from persisted entries.
    pub fn from_entries(entries: Vec<QueueEntry>) -> Self {
        MutationQueue { entries }
    }

    /// Appends an entry.
    pub fn enqueue(&mut self, entry: QueueEntry) {
        tracing::debug!(
            operation = %entry.operation,
            record = %entry.record_id(),
            "queued mutation"
        );
        self.entries.push(entry);
    }

    /// Enqueues, folding into an existing entry for the same record.
    ///
    /// A later snapshot replaces the earlier one in place, so the queue
    /// holds at most one entry per record. A create stays a create when
    /// updated, and a delete of a never-created record cancels both. A
    /// replaced snapshot starts over with a zero retry count.
    pub fn upsert(&mut self, entry: QueueEntry) {
        let Some(i) = self.entries.iter().position(|e| e.record_id() == entry.record_id()) else {
            self.enqueue(entry);
            return;
        };

        match (self.entries[i].operation, entry.operation) {
            (MutationKind::Create, MutationKind::Delete) => {
                self.entries.remove(i);
            }
            (MutationKind::Create, _) => {
                let existing = &mut self.entries[i];
                existing.record = entry.record;
                existing.retry_count = 0;
            }
            (_, operation) => {
                let existing = &mut self.entries[i];
                existing.operation = operation;
                existing.record = entry.record;
                existing.retry_count = 0;
            }
        }
    }

    /// Removes entries that were part of a settled batch.
    ///
    /// Entries enqueued or rewritten after the batch was taken survive.
    pub fn settle(&mut self, submitted: &[QueueEntry]) {
        self.entries.retain(|e| !submitted.contains(e));
    }

    /// All entries in queue order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes every entry targeting `record_id`, returning how many were dropped.
    pub fn remove_for(&mut self, record_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.record_id() != record_id);
        before - self.entries.len()
    }

    /// Returns the entries worth submitting against the given local state.
    ///
    /// Update and delete entries whose target is no longer present locally
    /// are skipped. Creates are always kept. The queue itself is unchanged.
    pub fn filter_relevant(&self, current: &[Record]) -> Vec<QueueEntry> {
        let present: HashSet<&str> = current.iter().map(|r| r.id.as_str()).collect();
        self.entries
            .iter()
            .filter(|e| !e.operation.targets_existing() || present.contains(e.record_id()))
            .cloned()
            .collect()
    }

    /// Records a failed flush round.
    ///
    /// Every entry that was part of the `submitted` snapshot has its retry
    /// count bumped by one. Entries queued or rewritten since are untouched.
    /// Entries whose new count exceeds `ceiling` are removed from the queue
    /// and returned.
    pub fn increment_and_prune(
        &mut self,
        submitted: &[QueueEntry],
        ceiling: u32,
    ) -> Vec<QueueEntry> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for mut entry in self.entries.drain(..) {
            if !submitted.contains(&entry) {
                kept.push(entry);
                continue;
            }
            entry.retry_count = entry.retry_count.saturating_add(1);
            if entry.retry_count > ceiling {
                tracing::warn!(
                    operation = %entry.operation,
                    record = %entry.record_id(),
                    retries = entry.retry_count - 1,
                    "dropping queued mutation after exceeding retry ceiling"
                );
                dropped.push(entry);
            } else {
                kept.push(entry);
            }
        }

        self.entries = kept;
        dropped
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
