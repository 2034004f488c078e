// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tally_core::clock::from_millis;
use tally_core::{ChangeEvent, ClockSource, MutationKind, Priority, QueueEntry, Record};
use tokio::sync::{mpsc, Notify};

use crate::remote::{RemoteError, RemoteFuture, RemoteResult, RemoteStore};

/// Mock clock for testing with controllable time.
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    pub fn new(initial_ms: u64) -> Self {
        MockClock { time_ms: AtomicU64::new(initial_ms) }
    }

    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

/// A record minted offline at `ms`.
pub fn local_record(text: &str, ms: u64) -> Record {
    Record {
        id: ms.to_string(),
        text: text.to_string(),
        completed: false,
        priority: Priority::Medium,
        created_at: from_millis(ms),
        updated_at: None,
        pending_create: true,
    }
}

/// A record the remote store has persisted, last written at `ms`.
pub fn server_record(id: &str, text: &str, ms: u64) -> Record {
    Record {
        id: id.to_string(),
        text: text.to_string(),
        completed: false,
        priority: Priority::Medium,
        created_at: from_millis(ms),
        updated_at: Some(from_millis(ms)),
        pending_create: false,
    }
}

/// A fresh queue entry.
pub fn entry(operation: MutationKind, record: Record) -> QueueEntry {
    QueueEntry::new(operation, record, from_millis(0))
}

/// Calls observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Update(String),
    Delete(String),
    Batch(usize),
}

struct MockState {
    records: Vec<Record>,
    session: bool,
    reachable: bool,
    reject: bool,
    fail_batch: bool,
    lists_left: Option<usize>,
    gate: Option<Arc<Notify>>,
    server_ms: u64,
    calls: Vec<Call>,
    batches: Vec<Vec<QueueEntry>>,
    feed: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
}

/// In-memory remote store for testing without a backend.
///
/// Clones share state so a test can keep a handle after moving one into the
/// engine.
#[derive(Clone)]
pub struct MockRemote {
    inner: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        MockRemote {
            inner: Arc::new(Mutex::new(MockState {
                records: Vec::new(),
                session: true,
                reachable: true,
                reject: false,
                fail_batch: false,
                lists_left: None,
                gate: None,
                server_ms: 1_800_000_000_000,
                calls: Vec::new(),
                batches: Vec::new(),
                feed: None,
            })),
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        let remote = Self::new();
        remote.inner.lock().unwrap().records = records;
        remote
    }

    pub fn set_session(&self, available: bool) {
        self.inner.lock().unwrap().session = available;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().unwrap().reachable = reachable;
    }

    /// Makes every write fail with `ValidationRejected`.
    pub fn set_reject(&self, reject: bool) {
        self.inner.lock().unwrap().reject = reject;
    }

    /// Makes only `batch_apply` fail with `Unreachable`.
    pub fn set_batch_fail(&self, fail: bool) {
        self.inner.lock().unwrap().fail_batch = fail;
    }

    /// Lets `n` more list calls succeed, then fails the rest with
    /// `Unreachable`. `None` lifts the limit.
    pub fn fail_lists_after(&self, n: Option<usize>) {
        self.inner.lock().unwrap().lists_left = n;
    }

    /// Holds create and batch responses until the returned gate is
    /// notified, once per response. Writes land server-side first.
    pub fn hold_responses(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().unwrap().gate = Some(Arc::clone(&gate));
        gate
    }

    /// Server-side rows.
    pub fn records(&self) -> Vec<Record> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Replaces server-side rows without recording a call.
    pub fn set_records(&self, records: Vec<Record>) {
        self.inner.lock().unwrap().records = records;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Every batch submitted via `batch_apply`, including failed ones.
    pub fn batches(&self) -> Vec<Vec<QueueEntry>> {
        self.inner.lock().unwrap().batches.clone()
    }

    /// Installs a push channel and returns its sending half.
    pub fn feed(&self) -> mpsc::UnboundedSender<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().feed = Some(rx);
        tx
    }
}

impl MockState {
    fn check(&self) -> RemoteResult<()> {
        if !self.reachable {
            return Err(RemoteError::Unreachable("mock offline".into()));
        }
        if !self.session {
            return Err(RemoteError::Unauthenticated);
        }
        Ok(())
    }

    fn check_write(&self) -> RemoteResult<()> {
        self.check()?;
        if self.reject {
            return Err(RemoteError::ValidationRejected("mock rejected".into()));
        }
        Ok(())
    }

    fn take_list(&mut self) -> RemoteResult<()> {
        match self.lists_left {
            Some(0) => Err(RemoteError::Unreachable("mock list failure".into())),
            Some(n) => {
                self.lists_left = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn stamp(&mut self) -> chrono::DateTime<chrono::Utc> {
        self.server_ms += 1;
        from_millis(self.server_ms)
    }

    fn create(&mut self, record: &Record) -> Record {
        let mut created = record.clone();
        created.id = uuid::Uuid::new_v4().to_string();
        created.updated_at = Some(self.stamp());
        self.records.push(created.clone());
        created
    }

    fn update(&mut self, id: &str, record: &Record) -> Option<Record> {
        let now = self.stamp();
        let row = self.records.iter_mut().find(|r| r.id == id)?;
        row.text = record.text.clone();
        row.completed = record.completed;
        row.priority = record.priority;
        row.updated_at = Some(now);
        Some(row.clone())
    }

    fn apply_batch(&mut self, entries: &[QueueEntry]) {
        for entry in entries {
            match entry.operation {
                MutationKind::Create => {
                    self.create(&entry.record);
                }
                MutationKind::Update => {
                    self.update(&entry.record.id, &entry.record);
                }
                MutationKind::Delete => {
                    let id = entry.record.id.clone();
                    self.records.retain(|r| r.id != id);
                }
            }
        }
    }
}

impl RemoteStore for MockRemote {
    fn is_session_available(&self) -> bool {
        self.inner.lock().unwrap().session
    }

    fn list_records(&self) -> RemoteFuture<'_, Vec<Record>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut state = inner.lock().unwrap();
            state.calls.push(Call::List);
            state.check()?;
            state.take_list()?;
            Ok(state.records.clone())
        })
    }

    fn create_record(&self, record: &Record) -> RemoteFuture<'_, Record> {
        let inner = Arc::clone(&self.inner);
        let record = record.clone();
        Box::pin(async move {
            let (created, gate) = {
                let mut state = inner.lock().unwrap();
                state.calls.push(Call::Create(record.id.clone()));
                state.check_write()?;
                (state.create(&record), state.gate.clone())
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(created)
        })
    }

    fn update_record(&self, id: &str, record: &Record) -> RemoteFuture<'_, Record> {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        let record = record.clone();
        Box::pin(async move {
            let mut state = inner.lock().unwrap();
            state.calls.push(Call::Update(id.clone()));
            state.check_write()?;
            state
                .update(&id, &record)
                .ok_or_else(|| RemoteError::ValidationRejected(format!("no row {id}")))
        })
    }

    fn delete_record(&self, id: &str) -> RemoteFuture<'_, ()> {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        Box::pin(async move {
            let mut state = inner.lock().unwrap();
            state.calls.push(Call::Delete(id.clone()));
            state.check_write()?;
            state.records.retain(|r| r.id != id);
            Ok(())
        })
    }

    fn batch_apply(&self, entries: Vec<QueueEntry>) -> RemoteFuture<'_, ()> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let gate = {
                let mut state = inner.lock().unwrap();
                state.calls.push(Call::Batch(entries.len()));
                state.batches.push(entries.clone());
                state.check_write()?;
                if state.fail_batch {
                    return Err(RemoteError::Unreachable("mock batch failure".into()));
                }
                state.apply_batch(&entries);
                state.gate.clone()
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(())
        })
    }

    fn change_feed(&self) -> Option<mpsc::UnboundedReceiver<ChangeEvent>> {
        self.inner.lock().unwrap().feed.take()
    }
}
