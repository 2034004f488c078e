// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network connectivity monitor.
//!
//! The monitor does not test connectivity itself. Whatever watches the OS or
//! platform connectivity signal calls [`NetworkMonitor::set_online`], and the
//! monitor fans each transition out to its subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use tally_core::{ClockSource, SystemClock};

/// Current connectivity as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_online: bool,
    /// When the monitor last observed the network coming up.
    pub last_online_time: Option<DateTime<Utc>>,
}

type Listener = Arc<dyn Fn(NetworkStatus) + Send + Sync>;

struct Inner {
    status: Mutex<NetworkStatus>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    clock: Arc<dyn ClockSource>,
}

/// Observes connectivity and notifies subscribers of transitions.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct NetworkMonitor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor").field("status", &self.status()).finish()
    }
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial connectivity.
    pub fn new(initially_online: bool) -> Self {
        Self::with_clock(initially_online, Arc::new(SystemClock))
    }

    /// Creates a monitor with a custom clock source (for testing).
    pub fn with_clock(initially_online: bool, clock: Arc<dyn ClockSource>) -> Self {
        let last_online_time = initially_online.then(|| clock.now());
        NetworkMonitor {
            inner: Arc::new(Inner {
                status: Mutex::new(NetworkStatus { is_online: initially_online, last_online_time }),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                clock,
            }),
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> NetworkStatus {
        match self.inner.status.lock() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Shorthand for `status().is_online`.
    pub fn is_online(&self) -> bool {
        self.status().is_online
    }

    /// Registers a listener called on every status transition.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        Subscription { id, monitor: Arc::downgrade(&self.inner) }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Feeds a connectivity observation into the monitor.
    ///
    /// Listeners are notified only when the status actually changes.
    pub fn set_online(&self, online: bool) {
        let next = {
            let Ok(mut status) = self.inner.status.lock() else {
                return;
            };
            if status.is_online == online {
                return;
            }
            status.is_online = online;
            if online {
                status.last_online_time = Some(self.inner.clock.now());
            }
            *status
        };

        if online {
            tracing::info!("network online");
        } else {
            tracing::warn!("network offline");
        }

        // Snapshot so listeners can subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(next);
        }
    }
}

impl Inner {
    fn remove(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id);
        }
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    monitor: Weak<Inner>,
}

impl Subscription {
    /// Deregisters the listener.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.monitor.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
