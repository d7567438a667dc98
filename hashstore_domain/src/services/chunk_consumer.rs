// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Consumer Contract
//!
//! This module defines the contract any byte-stream consumer must satisfy to
//! be pluggable into the fan-out pipeline. A consumer sees every chunk of a
//! file exactly once, in emission order, through a read-only borrow of the
//! shared buffer; it never owns the bytes and must not retain the borrow
//! past the call.
//!
//! ## Lifecycle
//!
//! 1. `on_start`: once, before the first chunk; allocate digest state,
//!    open classifier handles, and so on.
//! 2. `on_chunk`: once per non-terminal chunk, with the published payload.
//! 3. `on_end`: once, after the terminal chunk; produce the partial report.
//!
//! The pipeline runtime drives this lifecycle and supplies the barrier
//! synchronization around it; implementations contain no synchronization of
//! their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// The partial report a consumer emits when the stream ends.
///
/// `bytes_seen` is the total payload the consumer observed across
/// non-terminal chunks; the runtime cross-checks it against the producer's
/// count and rejects the run on mismatch. `labels` carries the consumer's
/// contribution to the merged metadata record (digests, content
/// descriptions); label keys may only add to the merged report, never
/// overwrite producer keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub bytes_seen: u64,
    pub labels: BTreeMap<String, String>,
}

impl ConsumerReport {
    /// Creates a report with the given byte count and no labels.
    pub fn with_bytes(bytes_seen: u64) -> Self {
        ConsumerReport {
            bytes_seen,
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label entry, returning self for chaining.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A pluggable consumer of the fan-out byte stream.
///
/// Implementations must be `Send` so the runtime can move them onto worker
/// threads. They must also track the total bytes they observe: the
/// byte-count cross-check is the pipeline's end-to-end integrity guard, and
/// it deliberately trusts each consumer's own accounting.
pub trait ChunkConsumer: Send {
    /// A short name for diagnostics and error messages.
    fn name(&self) -> &str;

    /// Called once before the first chunk.
    fn on_start(&mut self) -> Result<(), IngestError>;

    /// Called once per non-terminal chunk with a read-only payload view.
    ///
    /// The slice is only valid for the duration of the call.
    fn on_chunk(&mut self, payload: &[u8]) -> Result<(), IngestError>;

    /// Called once after the terminal chunk; produces the partial report.
    fn on_end(&mut self) -> Result<ConsumerReport, IngestError>;
}
