// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local durable cache for engine state.
//!
//! The engine hydrates from the cache once at construction and writes the
//! whole state back after every committed mutation. The cache only sees an
//! opaque serialized blob.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{QueueEntry, Record};

use crate::error::{Result, SyncError};

/// Load/save of a single serialized blob.
pub trait LocalCache: Send + Sync {
    /// Returns the last saved blob, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<String>>;

    /// Replaces the saved blob.
    fn save(&self, blob: &str) -> Result<()>;
}

/// The part of engine state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub todos: Vec<Record>,
    #[serde(default)]
    pub queue: Vec<QueueEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default = "default_auto_sync")]
    pub auto_sync_enabled: bool,
    /// Placeholders a batch created whose server rows have not been pulled yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclaimed_creates: Vec<Record>,
}

fn default_auto_sync() -> bool {
    true
}

impl PersistedState {
    /// Serializes the state to its cache blob.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a cache blob.
    pub fn from_blob(blob: &str) -> Result<Self> {
        Ok(serde_json::from_str(blob)?)
    }

    /// Reads the state from a cache, returning `None` for an empty cache.
    pub fn load_from(cache: &dyn LocalCache) -> Result<Option<Self>> {
        match cache.load()? {
            Some(blob) if !blob.trim().is_empty() => Ok(Some(Self::from_blob(&blob)?)),
            _ => Ok(None),
        }
    }
}

/// File-backed cache.
///
/// Writes go to a sibling temp file that is fsynced and renamed over the
/// target, so a crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Creates a cache at the given path. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCache { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LocalCache for FileCache {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(blob.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process cache with no durability.
#[derive(Debug, Default)]
pub struct MemoryCache {
    blob: Mutex<Option<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-seeded with a blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryCache { blob: Mutex::new(Some(blob.into())) }
    }
}

impl LocalCache for MemoryCache {
    fn load(&self) -> Result<Option<String>> {
        let blob = self.blob.lock().map_err(|_| SyncError::Cache("cache lock poisoned".into()))?;
        Ok(blob.clone())
    }

    fn save(&self, blob: &str) -> Result<()> {
        let mut slot =
            self.blob.lock().map_err(|_| SyncError::Cache("cache lock poisoned".into()))?;
        *slot = Some(blob.to_string());
        Ok(())
    }
}

impl<C: LocalCache + ?Sized> LocalCache for std::sync::Arc<C> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, blob: &str) -> Result<()> {
        (**self).save(blob)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
