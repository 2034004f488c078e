// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: Shared library for the tally sync engine
//!
//! This crate provides the record model, queued mutation types, pushed change
//! events, and the conflict resolver used by tally-sync.

pub mod clock;
pub mod error;
pub mod event;
pub mod mutation;
pub mod record;
pub mod resolve;

pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use mutation::{MutationKind, QueueEntry};
pub use record::{Priority, Record, RecordPatch};
pub use resolve::{LastWriteWins, Resolve};
