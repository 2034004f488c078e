// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine.
//!
//! [`SyncEngine`] owns the local record set, the offline mutation queue and
//! the sync metadata. User edits apply locally and persist first, then try
//! the remote store; anything the remote store cannot take right now lands
//! in the queue and is flushed as one batch on the next reconciliation.
//!
//! State lives behind one `std::sync::Mutex` that is never held across an
//! `.await`. Every remote call is a suspension point, so background tasks
//! (auto-sync, the change-feed pump) may interleave with a running sync.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tally_core::{
    ChangeEvent, ClockSource, LastWriteWins, MutationKind, Priority, QueueEntry, Record,
    RecordPatch, Resolve, SystemClock,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{LocalCache, PersistedState};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::network::{NetworkMonitor, NetworkStatus, Subscription};
use crate::queue::MutationQueue;
use crate::realtime::{self, ChangeOutcome};
use crate::remote::{RemoteError, RemoteStore};

/// Observable sync status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMetadata {
    /// True while any reconciliation is in flight.
    pub syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Display text of the most recent sync failure.
    pub sync_error: Option<String>,
    pub auto_sync_enabled: bool,
}

struct EngineState {
    todos: Vec<Record>,
    queue: MutationQueue,
    last_sync_time: Option<DateTime<Utc>>,
    sync_error: Option<String>,
    auto_sync_enabled: bool,
    in_flight: usize,
    /// Placeholder ids with a create call in flight.
    sending: HashSet<String>,
    /// Batch-created placeholders whose server rows have not been pulled yet.
    unclaimed: Vec<Unclaimed>,
    /// Pulls started so far.
    pulls: u64,
}

/// A placeholder the remote store accepted in a batch.
struct Unclaimed {
    /// The snapshot that was sent.
    sent: Record,
    /// Pull count when the batch was accepted. Pulls up to this one may
    /// predate the server row.
    accepted_after: u64,
}

impl EngineState {
    fn fresh(auto_sync_enabled: bool) -> Self {
        EngineState {
            todos: Vec::new(),
            queue: MutationQueue::new(),
            last_sync_time: None,
            sync_error: None,
            auto_sync_enabled,
            in_flight: 0,
            sending: HashSet::new(),
            unclaimed: Vec::new(),
            pulls: 0,
        }
    }

    fn hydrate(persisted: PersistedState) -> Self {
        EngineState {
            todos: persisted.todos,
            queue: MutationQueue::from_entries(persisted.queue),
            last_sync_time: persisted.last_sync_time,
            sync_error: None,
            auto_sync_enabled: persisted.auto_sync_enabled,
            in_flight: 0,
            sending: HashSet::new(),
            unclaimed: persisted
                .unclaimed_creates
                .into_iter()
                .map(|sent| Unclaimed { sent, accepted_after: 0 })
                .collect(),
            pulls: 0,
        }
    }

    fn snapshot(&self) -> PersistedState {
        PersistedState {
            todos: self.todos.clone(),
            queue: self.queue.entries().to_vec(),
            last_sync_time: self.last_sync_time,
            auto_sync_enabled: self.auto_sync_enabled,
            unclaimed_creates: self.unclaimed.iter().map(|u| u.sent.clone()).collect(),
        }
    }

    /// Ids of records with a queued delete.
    fn tombstones(&self) -> HashSet<String> {
        self.queue
            .entries()
            .iter()
            .filter(|e| e.operation == MutationKind::Delete)
            .map(|e| e.record_id().to_string())
            .collect()
    }

    /// Replaces local records with a resolved set, minus queued deletes.
    fn adopt(&mut self, resolved: Vec<Record>) {
        let tombstones = self.tombstones();
        self.todos = resolved.into_iter().filter(|r| !tombstones.contains(&r.id)).collect();
    }

    /// True while a placeholder's create has been sent but its server id is
    /// not known. Such records must not be sent again.
    fn awaits_server_id(&self, id: &str) -> bool {
        self.sending.contains(id) || self.unclaimed.iter().any(|u| u.sent.id == id)
    }

    /// Queues the newest local version of `record`, or `record` itself if it
    /// is not held locally.
    fn queue_latest(&mut self, record: Record, now: DateTime<Utc>) {
        let record = find(&self.todos, &record.id).cloned().unwrap_or(record);
        let operation = if record.is_pending_create() {
            MutationKind::Create
        } else {
            MutationKind::Update
        };
        self.queue.upsert(QueueEntry::new(operation, record, now));
    }

    /// Swaps the local version of a pushed record for the remote store's.
    ///
    /// `baseline` is the local version when the push was sent. Edits made
    /// since are carried onto the confirmed row and queued as an update. A
    /// placeholder deleted since queues a delete of the row it became.
    fn confirm(
        &mut self,
        sent_id: &str,
        baseline: Option<&Record>,
        confirmed: Record,
        now: DateTime<Utc>,
    ) -> Record {
        let Some(baseline) = baseline else {
            self.queue.remove_for(sent_id);
            return confirmed;
        };
        let Some(slot) = self.todos.iter().position(|r| r.id == sent_id) else {
            if baseline.is_pending_create() {
                self.todos.retain(|r| r.id != confirmed.id);
                self.queue.upsert(QueueEntry::new(MutationKind::Delete, confirmed.clone(), now));
            }
            return confirmed;
        };

        self.queue.remove_for(sent_id);
        let local = self.todos.remove(slot);
        let adopted = if local.same_content(baseline) {
            confirmed
        } else {
            let merged = carry_edits(&local, confirmed, now);
            self.queue.upsert(QueueEntry::new(MutationKind::Update, merged.clone(), now));
            merged
        };

        // A pushed insert may already have delivered the row.
        match self.todos.iter_mut().find(|r| r.id == adopted.id) {
            Some(existing) => *existing = adopted.clone(),
            None => self.todos.insert(slot, adopted.clone()),
        }
        adopted
    }

    /// Maps batch-created placeholders onto the rows of a pull.
    ///
    /// A placeholder whose row is missing from a pull started after its
    /// batch was accepted is queued as a create again.
    fn claim_created(&mut self, remote: &[Record], pull: u64, now: DateTime<Utc>) {
        let mut taken = HashSet::new();
        for pending in std::mem::take(&mut self.unclaimed) {
            match find_created(remote, &self.todos, &taken, &pending.sent).cloned() {
                Some(row) => {
                    tracing::debug!(
                        local = %pending.sent.id,
                        remote = %row.id,
                        "claimed created record"
                    );
                    taken.insert(row.id.clone());
                    self.confirm(&pending.sent.id, Some(&pending.sent), row, now);
                }
                None if pull > pending.accepted_after => {
                    tracing::warn!(
                        record = %pending.sent.id,
                        "created record missing from remote store, queueing again"
                    );
                    if let Ok(local) = find(&self.todos, &pending.sent.id) {
                        let entry = QueueEntry::new(MutationKind::Create, local.clone(), now);
                        self.queue.upsert(entry);
                    }
                }
                None => self.unclaimed.push(pending),
            }
        }
    }
}

/// Finds the row a batch created from `sent`.
///
/// Matches on creation time and text first. Failing that, an unseen row
/// with the same creation time, then the only unseen row with the same text.
fn find_created<'a>(
    remote: &'a [Record],
    local: &[Record],
    taken: &HashSet<String>,
    sent: &Record,
) -> Option<&'a Record> {
    let free = |r: &&Record| !taken.contains(&r.id);
    let unseen = |r: &&Record| free(r) && local.iter().all(|l| l.id != r.id);

    if let Some(row) =
        remote.iter().filter(free).find(|r| r.created_at == sent.created_at && r.text == sent.text)
    {
        return Some(row);
    }
    if let Some(row) = remote.iter().filter(unseen).find(|r| r.created_at == sent.created_at) {
        return Some(row);
    }
    let mut same_text = remote.iter().filter(unseen).filter(|r| r.text == sent.text);
    match (same_text.next(), same_text.next()) {
        (Some(row), None) => Some(row),
        _ => None,
    }
}

/// Carries local field edits onto a confirmed row, ordered after it.
fn carry_edits(local: &Record, confirmed: Record, now: DateTime<Utc>) -> Record {
    let after = confirmed.effective_timestamp() + chrono::Duration::milliseconds(1);
    Record {
        text: local.text.clone(),
        completed: local.completed,
        priority: local.priority,
        updated_at: Some(now.max(after)),
        ..confirmed
    }
}

/// Background tasks owned by a started engine.
struct Running {
    cancel: CancellationToken,
    subscription: Subscription,
    tasks: Vec<JoinHandle<()>>,
}

/// Marks the engine syncing for as long as it lives.
struct SyncingGuard<'a> {
    state: &'a Mutex<EngineState>,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Offline-first reconciliation between local state and a [`RemoteStore`].
pub struct SyncEngine<R: RemoteStore> {
    remote: R,
    cache: Box<dyn LocalCache>,
    monitor: NetworkMonitor,
    resolver: Box<dyn Resolve>,
    clock: Arc<dyn ClockSource>,
    config: SyncConfig,
    state: Mutex<EngineState>,
    running: Mutex<Option<Running>>,
}

impl<R: RemoteStore> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("monitor", &self.monitor)
            .field("config", &self.config)
            .field("metadata", &self.metadata())
            .finish_non_exhaustive()
    }
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Creates an engine and hydrates it from `cache`.
    ///
    /// An empty cache starts from an empty record set with auto-sync taken
    /// from `config`. A cache that cannot be read or parsed is an error.
    pub fn new<C>(remote: R, cache: C, monitor: NetworkMonitor, config: SyncConfig) -> Result<Self>
    where
        C: LocalCache + 'static,
    {
        let state = match PersistedState::load_from(&cache)? {
            Some(persisted) => {
                tracing::debug!(
                    todos = persisted.todos.len(),
                    queued = persisted.queue.len(),
                    "hydrated sync state from cache"
                );
                EngineState::hydrate(persisted)
            }
            None => EngineState::fresh(config.auto_sync),
        };

        Ok(SyncEngine {
            remote,
            cache: Box::new(cache),
            monitor,
            resolver: Box::new(LastWriteWins),
            clock: Arc::new(SystemClock),
            config,
            state: Mutex::new(state),
            running: Mutex::new(None),
        })
    }

    /// Replaces the clock used for minting ids and stamping sync times.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the conflict resolver.
    pub fn with_resolver(mut self, resolver: impl Resolve + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current local records.
    pub fn todos(&self) -> Vec<Record> {
        lock(&self.state).todos.clone()
    }

    /// Current sync status.
    pub fn metadata(&self) -> SyncMetadata {
        let state = lock(&self.state);
        SyncMetadata {
            syncing: state.in_flight > 0,
            last_sync_time: state.last_sync_time,
            sync_error: state.sync_error.clone(),
            auto_sync_enabled: state.auto_sync_enabled,
        }
    }

    /// Pending mutations in queue order.
    pub fn queue(&self) -> Vec<QueueEntry> {
        lock(&self.state).queue.entries().to_vec()
    }

    pub fn is_syncing(&self) -> bool {
        lock(&self.state).in_flight > 0
    }

    pub fn set_auto_sync(&self, enabled: bool) {
        let mut state = lock(&self.state);
        state.auto_sync_enabled = enabled;
        self.persist(&state);
        tracing::info!(enabled, "auto-sync toggled");
    }

    pub fn clear_sync_error(&self) {
        lock(&self.state).sync_error = None;
    }

    fn auto_sync_enabled(&self) -> bool {
        lock(&self.state).auto_sync_enabled
    }

    fn begin_sync(&self) -> SyncingGuard<'_> {
        lock(&self.state).in_flight += 1;
        SyncingGuard { state: &self.state }
    }

    /// Marks the engine syncing unless a sync is already in flight.
    fn try_begin_sync(&self) -> Option<SyncingGuard<'_>> {
        let mut state = lock(&self.state);
        if state.in_flight > 0 {
            return None;
        }
        state.in_flight += 1;
        Some(SyncingGuard { state: &self.state })
    }

    /// Writes the state through to the cache.
    fn persist(&self, state: &EngineState) {
        let saved = state.snapshot().to_blob().and_then(|blob| self.cache.save(&blob));
        if let Err(e) = saved {
            tracing::warn!(error = %e, "failed to persist sync state");
        }
    }

    /// Stores a failure in `sync_error` and hands it back.
    fn record_failure(&self, err: SyncError) -> SyncError {
        tracing::warn!(error = %err, "sync failed");
        lock(&self.state).sync_error = Some(err.to_string());
        err
    }

    fn mark_synced(&self, state: &mut EngineState) {
        state.last_sync_time = Some(self.clock.now());
        state.sync_error = None;
    }

    fn require_session(&self) -> Result<()> {
        if self.remote.is_session_available() {
            Ok(())
        } else {
            Err(SyncError::NotAuthenticated)
        }
    }

    fn remote_available(&self) -> bool {
        self.monitor.is_online() && self.remote.is_session_available()
    }

    // Reconciliation

    /// Full resync: pull every remote record and resolve it against local.
    ///
    /// On failure local records are left untouched.
    pub async fn sync_todos(&self) -> Result<()> {
        let _syncing = self.begin_sync();
        tracing::debug!("full resync started");

        let (pull, remote) = match self.pull().await {
            Ok(pulled) => pulled,
            Err(e) => return Err(self.record_failure(e)),
        };

        let mut state = lock(&self.state);
        state.claim_created(&remote, pull, self.clock.now());
        let resolved = self.resolver.resolve(&state.todos, &remote);
        state.adopt(resolved);
        self.mark_synced(&mut state);
        self.persist(&state);
        tracing::info!(records = state.todos.len(), "full resync complete");
        Ok(())
    }

    /// Lists remote records, returning the pull's sequence number with them.
    async fn pull(&self) -> Result<(u64, Vec<Record>)> {
        self.require_session()?;
        let pull = {
            let mut state = lock(&self.state);
            state.pulls += 1;
            state.pulls
        };
        Ok((pull, self.remote.list_records().await?))
    }

    /// Pushes one record to the remote store.
    ///
    /// Offline, or without a session, the record is queued and the call
    /// succeeds. A failed push is queued too and the error is returned,
    /// except a validation rejection, which is never retried.
    pub async fn sync_todo(&self, record: Record) -> Result<()> {
        self.push(record).await.map(|_| ())
    }

    async fn push(&self, record: Record) -> Result<Option<Record>> {
        let _syncing = self.begin_sync();
        let creating = record.is_pending_create();
        let available = self.remote_available();

        let baseline = {
            let mut state = lock(&self.state);
            if !available || state.awaits_server_id(&record.id) {
                tracing::debug!(record = %record.id, available, "cannot send record now, queueing");
                state.queue_latest(record, self.clock.now());
                self.persist(&state);
                return Ok(None);
            }
            if creating {
                state.sending.insert(record.id.clone());
            }
            find(&state.todos, &record.id).ok().cloned()
        };

        let payload = record.remote_payload();
        let pushed = if creating {
            self.remote.create_record(&payload).await
        } else {
            self.remote.update_record(&record.id, &payload).await
        };

        let mut state = lock(&self.state);
        state.sending.remove(&record.id);
        match pushed {
            Ok(confirmed) => {
                let remote_id = confirmed.id.clone();
                let now = self.clock.now();
                let adopted = state.confirm(&record.id, baseline.as_ref(), confirmed, now);
                self.persist(&state);
                tracing::debug!(local = %record.id, remote = %remote_id, "record synced");
                Ok(Some(adopted))
            }
            Err(RemoteError::ValidationRejected(reason)) => {
                drop(state);
                Err(self.record_failure(SyncError::ValidationRejected(reason)))
            }
            Err(e) => {
                // Nothing to retry for a record deleted while in flight.
                if baseline.is_none() || find(&state.todos, &record.id).is_ok() {
                    state.queue_latest(record, self.clock.now());
                    self.persist(&state);
                }
                drop(state);
                Err(self.record_failure(e.into()))
            }
        }
    }

    fn enqueue_entry(&self, entry: QueueEntry) {
        let mut state = lock(&self.state);
        state.queue.upsert(entry);
        self.persist(&state);
    }

    /// Flushes the offline queue as one batch, then runs a full resync.
    ///
    /// A failed batch counts against every submitted entry; entries past the
    /// configured retry ceiling are dropped.
    pub async fn process_sync_queue(&self) -> Result<()> {
        if lock(&self.state).queue.is_empty() {
            return Ok(());
        }

        let _syncing = self.begin_sync();
        if let Err(e) = self.flush().await {
            return Err(self.record_failure(e));
        }
        self.sync_todos().await
    }

    async fn flush(&self) -> Result<()> {
        let (pull, remote) = self.pull().await?;

        let (submitted, batch) = {
            let mut state = lock(&self.state);
            state.claim_created(&remote, pull, self.clock.now());
            let resolved = self.resolver.resolve(&state.todos, &remote);
            let relevant = state.queue.filter_relevant(&resolved);
            state.adopt(resolved);

            // Entries for placeholders still waiting on a server id stay queued.
            let submitted: Vec<QueueEntry> = state
                .queue
                .entries()
                .iter()
                .filter(|e| !state.awaits_server_id(e.record_id()))
                .cloned()
                .collect();
            let batch: Vec<QueueEntry> =
                relevant.into_iter().filter(|e| submitted.contains(e)).collect();
            for entry in batch.iter().filter(|e| e.operation == MutationKind::Create) {
                state.sending.insert(entry.record_id().to_string());
            }
            self.persist(&state);
            (submitted, batch)
        };

        tracing::debug!(
            entries = batch.len(),
            skipped = submitted.len() - batch.len(),
            "submitting queued mutations"
        );
        let created: Vec<Record> = batch
            .iter()
            .filter(|e| e.operation == MutationKind::Create)
            .map(|e| e.record.clone())
            .collect();
        let payload: Vec<QueueEntry> = batch
            .into_iter()
            .map(|e| QueueEntry { record: e.record.remote_payload(), ..e })
            .collect();

        let outcome =
            if payload.is_empty() { Ok(()) } else { self.remote.batch_apply(payload).await };

        let mut state = lock(&self.state);
        for record in &created {
            state.sending.remove(&record.id);
        }
        match outcome {
            Ok(()) => {
                state.queue.settle(&submitted);
                // Placeholders stay until a pull shows the rows they became.
                let accepted_after = state.pulls;
                state
                    .unclaimed
                    .extend(created.into_iter().map(|sent| Unclaimed { sent, accepted_after }));
                self.mark_synced(&mut state);
                self.persist(&state);
                tracing::info!(entries = submitted.len(), "flushed queued mutations");
                Ok(())
            }
            Err(e) => {
                let dropped = state.queue.increment_and_prune(&submitted, self.config.max_retries);
                self.persist(&state);
                tracing::debug!(
                    dropped = dropped.len(),
                    remaining = state.queue.len(),
                    "batch failed"
                );
                Err(e.into())
            }
        }
    }

    /// Reconnect handler body, run after the settle delay.
    ///
    /// Errors are logged and left in `sync_error`.
    pub async fn auto_sync(&self) {
        if !self.auto_sync_enabled() {
            tracing::debug!("auto-sync disabled, skipping");
            return;
        }
        if !self.monitor.is_online() {
            tracing::debug!("connection dropped during settle delay, skipping auto-sync");
            return;
        }
        let Some(_syncing) = self.try_begin_sync() else {
            tracing::debug!("sync already in flight, skipping auto-sync");
            return;
        };

        let queued = lock(&self.state).queue.len();
        tracing::info!(queued, "auto-sync after reconnect");
        let result =
            if queued > 0 { self.process_sync_queue().await } else { self.sync_todos().await };
        if let Err(e) = result {
            tracing::warn!(error = %e, "auto-sync failed");
        }
    }

    /// Applies one event pushed by the remote store.
    pub fn apply_realtime(&self, event: &ChangeEvent) -> ChangeOutcome {
        let mut state = lock(&self.state);
        let outcome = realtime::apply(&mut state.todos, event);
        if outcome == ChangeOutcome::Inserted {
            state.last_sync_time = Some(self.clock.now());
        }
        if outcome.changed() {
            self.persist(&state);
        }
        tracing::debug!(
            event = %event.event_type,
            record = %event.record.id,
            ?outcome,
            "applied pushed change"
        );
        outcome
    }

    // User operations

    /// Creates a task locally and pushes it.
    ///
    /// Returns the server's version when the push succeeds, otherwise the
    /// local one. Push failures never roll the task back.
    pub async fn add_todo(&self, text: impl Into<String>, priority: Priority) -> Record {
        let record = {
            let mut state = lock(&self.state);
            let mut now_ms = self.clock.now_ms();
            while state.todos.iter().any(|r| r.id == now_ms.to_string()) {
                now_ms += 1;
            }
            let record = Record::new_local(text, priority, now_ms);
            state.todos.push(record.clone());
            self.persist(&state);
            record
        };
        tracing::debug!(record = %record.id, "task added");

        match self.push(record.clone()).await {
            Ok(Some(confirmed)) => confirmed,
            Ok(None) => record,
            Err(e) => {
                tracing::debug!(error = %e, record = %record.id, "push after add failed");
                record
            }
        }
    }

    /// Flips a task's completed flag and pushes it.
    pub async fn toggle_todo(&self, id: &str) -> Result<()> {
        let patch = {
            let state = lock(&self.state);
            let record = find(&state.todos, id)?;
            RecordPatch::completed(!record.completed)
        };
        self.update_todo(id, patch).await
    }

    /// Applies a partial edit and pushes it. An edit that changes nothing
    /// is not pushed.
    pub async fn update_todo(&self, id: &str, patch: RecordPatch) -> Result<()> {
        let snapshot = {
            let mut state = lock(&self.state);
            let now = self.clock.now();
            let record = find_mut(&mut state.todos, id)?;
            if !record.apply_patch(&patch) {
                return Ok(());
            }
            // Server-known rows take the edit time so local edits win ties.
            if !record.is_pending_create() {
                record.updated_at = Some(now);
            }
            let snapshot = record.clone();
            self.persist(&state);
            snapshot
        };
        self.sync_todo(snapshot).await
    }

    /// Deletes a task locally and on the remote store.
    ///
    /// A task the remote store never saw only loses its queued entries.
    /// Otherwise the delete is sent now or queued for later.
    pub async fn delete_todo(&self, id: &str) -> Result<()> {
        let removed = {
            let mut state = lock(&self.state);
            let position = state
                .todos
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| SyncError::RecordNotFound(id.to_string()))?;
            let removed = state.todos.remove(position);
            if removed.is_pending_create() {
                state.queue.remove_for(&removed.id);
                self.persist(&state);
                tracing::debug!(record = %removed.id, "discarded unsynced task");
                return Ok(());
            }
            self.persist(&state);
            removed
        };

        let _syncing = self.begin_sync();
        if !self.remote_available() {
            tracing::debug!(record = %removed.id, "remote store unavailable, queueing delete");
            self.enqueue_entry(QueueEntry::new(MutationKind::Delete, removed, self.clock.now()));
            return Ok(());
        }

        match self.remote.delete_record(&removed.id).await {
            Ok(()) => {
                let mut state = lock(&self.state);
                state.queue.remove_for(&removed.id);
                self.persist(&state);
                tracing::debug!(record = %removed.id, "task deleted");
                Ok(())
            }
            Err(RemoteError::ValidationRejected(reason)) => {
                Err(self.record_failure(SyncError::ValidationRejected(reason)))
            }
            Err(e) => {
                self.enqueue_entry(QueueEntry::new(
                    MutationKind::Delete,
                    removed,
                    self.clock.now(),
                ));
                Err(self.record_failure(e.into()))
            }
        }
    }
}

fn find<'a>(todos: &'a [Record], id: &str) -> Result<&'a Record> {
    todos.iter().find(|r| r.id == id).ok_or_else(|| SyncError::RecordNotFound(id.to_string()))
}

fn find_mut<'a>(todos: &'a mut [Record], id: &str) -> Result<&'a mut Record> {
    todos.iter_mut().find(|r| r.id == id).ok_or_else(|| SyncError::RecordNotFound(id.to_string()))
}

// Lifecycle

impl<R: RemoteStore + 'static> SyncEngine<R> {
    /// Starts the background tasks on the current tokio runtime.
    ///
    /// Subscribes to network transitions for auto-sync and pumps the remote
    /// store's change feed, when it has one. Starting twice is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut running = lock(&self.running);
        if running.is_some() {
            tracing::debug!("sync engine already started");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::Runtime(format!("start requires a tokio runtime: {e}")))?;
        let cancel = CancellationToken::new();

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.monitor.subscribe(move |status| {
            // The receiver only goes away once the engine stops.
            let _ = tx.send(status);
        });

        let watcher = Arc::clone(self).watch_network(rx, cancel.clone(), runtime.clone());
        let mut tasks = vec![runtime.spawn(watcher)];
        if let Some(feed) = self.remote.change_feed() {
            tasks.push(runtime.spawn(Arc::clone(self).pump_changes(feed, cancel.clone())));
        }

        *running = Some(Running { cancel, subscription, tasks });
        tracing::info!("sync engine started");
        Ok(())
    }

    /// Stops background tasks and unsubscribes from the monitor.
    pub fn stop(&self) {
        let Some(running) = lock(&self.running).take() else {
            return;
        };
        running.cancel.cancel();
        running.subscription.unsubscribe();
        for task in running.tasks {
            task.abort();
        }
        tracing::info!("sync engine stopped");
    }

    async fn watch_network(
        self: Arc<Self>,
        mut transitions: mpsc::UnboundedReceiver<NetworkStatus>,
        cancel: CancellationToken,
        runtime: tokio::runtime::Handle,
    ) {
        loop {
            let status = tokio::select! {
                _ = cancel.cancelled() => break,
                status = transitions.recv() => match status {
                    Some(status) => status,
                    None => break,
                },
            };
            if !status.is_online {
                continue;
            }
            if !self.auto_sync_enabled() {
                tracing::debug!("reconnected with auto-sync disabled");
                continue;
            }

            let engine = Arc::clone(&self);
            let cancel = cancel.clone();
            let delay = self.config.settle_delay();
            runtime.spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => engine.auto_sync().await,
                }
            });
        }
    }

    async fn pump_changes(
        self: Arc<Self>,
        mut feed: mpsc::UnboundedReceiver<ChangeEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = feed.recv() => match event {
                    Some(event) => {
                        self.apply_realtime(&event);
                    }
                    None => {
                        tracing::debug!("change feed closed");
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
