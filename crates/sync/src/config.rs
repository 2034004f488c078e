// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine configuration.
//!
//! Configuration is stored in `config.toml` and includes:
//! - `settle_delay_ms`: debounce between reconnecting and auto-syncing
//! - `max_retries`: failed flush rounds a queued mutation survives
//! - `auto_sync`: whether reconnecting triggers a sync at all
//! - `cache_path`: optional location of the persisted state blob

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Result, SyncError};
use crate::queue::DEFAULT_RETRY_CEILING;

const CONFIG_FILE_NAME: &str = "config.toml";
const CACHE_FILE_NAME: &str = "cache.json";
const APP_DIR_NAME: &str = "tally";

/// Engine configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between an offline→online transition and the automatic sync.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Failed flush rounds an entry survives before it is dropped (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial value of the auto-sync toggle when no state was persisted.
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    /// Cache file location (absolute, or relative to the config directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    DEFAULT_RETRY_CEILING
}

fn default_auto_sync() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            settle_delay_ms: default_settle_delay_ms(),
            max_retries: default_max_retries(),
            auto_sync: default_auto_sync(),
            cache_path: None,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `config.toml` in the given directory.
    ///
    /// A `TALLY_AUTO_SYNC` environment value overrides the file.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| SyncError::Config(format!("failed to read config: {}", e)))?;
        let mut config = Self::parse(&content)?;
        if let Some(auto_sync) = env::auto_sync() {
            config.auto_sync = auto_sync;
        }
        Ok(config)
    }

    /// Loads configuration, falling back to defaults if the file is missing.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        if dir.join(CONFIG_FILE_NAME).exists() {
            Self::load(dir)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)
            .map_err(|e| SyncError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to `config.toml` in the given directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("failed to serialize config: {}", e)))?;
        fs::create_dir_all(dir)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.settle_delay_ms > 60_000 {
            return Err(SyncError::Config(format!(
                "settle_delay_ms must be at most 60000, got {}",
                self.settle_delay_ms
            )));
        }
        Ok(())
    }

    /// The settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Resolves the cache file path.
    ///
    /// An explicit `cache_path` wins (relative paths resolve against
    /// `config_dir`). Otherwise the file lives in [`state_dir`].
    pub fn cache_path(&self, config_dir: &Path) -> PathBuf {
        match &self.cache_path {
            Some(path) => {
                let path = Path::new(path);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    config_dir.join(path)
                }
            }
            None => state_dir().join(CACHE_FILE_NAME),
        }
    }
}

/// Directory for persisted engine state.
///
/// Resolution order:
/// 1. `TALLY_STATE_DIR`
/// 2. `$XDG_STATE_HOME/tally`
/// 3. Platform state dir (`~/.local/state/tally` on Linux), else the
///    platform data dir, else `./.tally`
pub fn state_dir() -> PathBuf {
    resolve_state_dir(env::state_dir(), env::xdg_state_home())
}

pub(crate) fn resolve_state_dir(
    explicit: Option<PathBuf>,
    xdg_state_home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Some(xdg) = xdg_state_home {
        return xdg.join(APP_DIR_NAME);
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".tally"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
