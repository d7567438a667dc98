// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Buffer Synchronizer
//!
//! One [`BufferSync`] names a fan-out buffer and carries the multi-party
//! barrier that gates each round on it. The synchronizer is the only object
//! the producer and consumers share; each side attaches to the buffer by
//! name on its own.
//!
//! ## Round Protocol
//!
//! The barrier's party count is fixed at construction to
//! `producers (=1) + consumers`. The producer writes a chunk, then trips the
//! barrier; every consumer trips the barrier, then snapshots. The trip is
//! therefore the happens-before edge between the write of the length header
//! and every snapshot; no other fence exists or is needed.
//!
//! ## Timeouts
//!
//! Every wait carries a timeout (the synchronizer's own, unless the caller
//! passes an explicit one, which takes precedence). A timed-out barrier
//! breaks permanently: every concurrent and subsequent wait fails
//! immediately, so one stalled peer can never leave the others blocked.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use hashstore_domain::IngestError;

use super::fanout_buffer::BufferHandle;

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

/// A reusable multi-party rendezvous with a timeout.
///
/// Unlike `std::sync::Barrier`, a wait here can fail: when any party's wait
/// times out, the barrier breaks and unblocks everyone with an error. The
/// pipeline treats that as fatal to the whole run, which is exactly the
/// semantics a stalled peer requires.
#[derive(Debug)]
pub struct RoundBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
    parties: usize,
}

impl RoundBarrier {
    /// Creates a barrier for `parties` peers (at least one).
    pub fn new(parties: usize) -> Self {
        RoundBarrier {
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                broken: false,
            }),
            cvar: Condvar::new(),
            parties: parties.max(1),
        }
    }

    /// The fixed number of peers that must arrive to complete a round.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Blocks until all parties arrive or `timeout` elapses.
    ///
    /// # Errors
    /// Returns `IngestError::Timeout` when the wait elapses or when the
    /// barrier was already broken by another party's timeout.
    pub fn wait(&self, timeout: Duration) -> Result<(), IngestError> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(IngestError::Timeout(
                "barrier is broken by an earlier timeout".to_string(),
            ));
        }

        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(());
        }

        let generation = state.generation;
        let deadline = Instant::now() + timeout;
        loop {
            let result = self.cvar.wait_until(&mut state, deadline);
            // A generation bump means this round completed; a break that
            // happens in a later round is not this waiter's failure.
            if state.generation != generation {
                return Ok(());
            }
            if state.broken {
                return Err(IngestError::Timeout(
                    "barrier is broken by an earlier timeout".to_string(),
                ));
            }
            if result.timed_out() {
                state.broken = true;
                self.cvar.notify_all();
                return Err(IngestError::Timeout(format!(
                    "barrier wait timed out after {:?}",
                    timeout
                )));
            }
        }
    }
}

/// A named handle to a fan-out buffer plus the barrier gating its rounds.
///
/// Synchronizers are cheap to clone (the barrier is shared), and they hash
/// and order by buffer name so they can live in stable, deterministic
/// collections.
#[derive(Debug, Clone)]
pub struct BufferSync {
    buffer_name: String,
    barrier: Arc<RoundBarrier>,
    timeout: Duration,
}

impl BufferSync {
    /// Creates a synchronizer for the named buffer.
    pub fn new(buffer_name: impl Into<String>, barrier: Arc<RoundBarrier>, timeout: Duration) -> Self {
        BufferSync {
            buffer_name: buffer_name.into(),
            barrier,
            timeout,
        }
    }

    /// The name of the buffer this synchronizer gates.
    pub fn buffer_name(&self) -> &str {
        &self.buffer_name
    }

    /// The synchronizer's own timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attaches to the underlying buffer by name.
    pub fn attach(&self) -> Result<BufferHandle, IngestError> {
        BufferHandle::attach(&self.buffer_name)
    }

    /// Trips the barrier, blocking until all parties arrive.
    ///
    /// An explicitly passed `timeout` takes precedence over the
    /// synchronizer's own.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<(), IngestError> {
        self.barrier.wait(timeout.unwrap_or(self.timeout))
    }
}

impl PartialEq for BufferSync {
    fn eq(&self, other: &Self) -> bool {
        self.buffer_name == other.buffer_name
    }
}

impl Eq for BufferSync {}

impl Hash for BufferSync {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.buffer_name.hash(state);
    }
}

impl PartialOrd for BufferSync {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BufferSync {
    fn cmp(&self, other: &Self) -> Ordering {
        self.buffer_name.cmp(&other.buffer_name)
    }
}
