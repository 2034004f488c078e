// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the local cache module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::{local_record, server_record};
use tally_core::MutationKind;
use tempfile::tempdir;

fn sample_state() -> PersistedState {
    let offline = local_record("Buy milk", 1_700_000_000_000);
    PersistedState {
        todos: vec![server_record("srv-1", "Walk dog", 1_000), offline.clone()],
        queue: vec![QueueEntry::new(
            MutationKind::Create,
            offline,
            tally_core::clock::from_millis(1_700_000_000_001),
        )],
        last_sync_time: Some(tally_core::clock::from_millis(5_000)),
        auto_sync_enabled: false,
        unclaimed_creates: vec![local_record("Sent", 1_600_000_000_000)],
    }
}

#[test]
fn test_file_cache_missing_file_loads_none() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path().join("cache.json"));
    assert!(cache.load().unwrap().is_none());
}

#[test]
fn test_file_cache_save_and_load() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path().join("nested").join("cache.json"));

    cache.save("{\"todos\":[]}").unwrap();
    assert_eq!(cache.load().unwrap().as_deref(), Some("{\"todos\":[]}"));

    cache.save("{}").unwrap();
    assert_eq!(cache.load().unwrap().as_deref(), Some("{}"));
    assert!(!dir.path().join("nested").join("cache.json.tmp").exists());
}

#[test]
fn test_persisted_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let state = sample_state();

    {
        let cache = FileCache::new(&path);
        cache.save(&state.to_blob().unwrap()).unwrap();
    }

    let cache = FileCache::new(&path);
    let restored = PersistedState::load_from(&cache).unwrap().unwrap();
    assert_eq!(restored, state);
}

#[test]
fn test_persisted_state_empty_blob_is_none() {
    let cache = MemoryCache::with_blob("  ");
    assert!(PersistedState::load_from(&cache).unwrap().is_none());
    assert!(PersistedState::load_from(&MemoryCache::new()).unwrap().is_none());
}

#[test]
fn test_persisted_state_defaults() {
    let state = PersistedState::from_blob("{}").unwrap();
    assert!(state.todos.is_empty());
    assert!(state.queue.is_empty());
    assert!(state.last_sync_time.is_none());
    assert!(state.auto_sync_enabled);
    assert!(state.unclaimed_creates.is_empty());
    assert!(!state.to_blob().unwrap().contains("unclaimedCreates"));
}

#[test]
fn test_persisted_state_corrupt_blob_errors() {
    let cache = MemoryCache::with_blob("not json");
    let err = PersistedState::load_from(&cache).unwrap_err();
    assert!(matches!(err, SyncError::Json(_)));
}

#[test]
fn test_memory_cache_round_trip() {
    let cache = MemoryCache::new();
    cache.save("blob").unwrap();
    assert_eq!(cache.load().unwrap().as_deref(), Some("blob"));
}
