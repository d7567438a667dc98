// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Buffer Capacity Value Object
//!
//! This module provides the [`BufferCapacity`] value object: the validated
//! payload capacity of one fan-out buffer. The capacity bounds how many
//! bytes a single pipeline round can carry; the shared region allocated for
//! a buffer is this capacity plus the fixed-width length header.
//!
//! ## Bounds
//!
//! - Minimum: 4 KiB. Anything smaller makes the barrier overhead dominate.
//! - Maximum: 1 GiB. Each buffer in the pool consumes this much shared
//!   memory for the lifetime of the runtime.
//! - Default: 128 MiB, matching the historical reader chunk size.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// A validated fan-out buffer payload capacity in bytes.
///
/// # Examples
///
/// ```
/// use hashstore_domain::BufferCapacity;
///
/// let cap = BufferCapacity::from_mib(8).unwrap();
/// assert_eq!(cap.bytes(), 8 * 1024 * 1024);
/// assert!(BufferCapacity::new(16).is_err()); // below the 4 KiB floor
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct BufferCapacity(u64);

impl BufferCapacity {
    /// Minimum payload capacity: 4 KiB.
    pub const MIN: u64 = 4 * 1024;

    /// Maximum payload capacity: 1 GiB.
    pub const MAX: u64 = 1024 * 1024 * 1024;

    /// Default payload capacity: 128 MiB.
    pub const DEFAULT: u64 = 128 * 1024 * 1024;

    /// Creates a capacity, validating it against the system bounds.
    ///
    /// # Errors
    /// Returns `IngestError::InvalidConfiguration` when the value lies
    /// outside `[MIN, MAX]`.
    pub fn new(bytes: u64) -> Result<Self, IngestError> {
        if !(Self::MIN..=Self::MAX).contains(&bytes) {
            return Err(IngestError::InvalidConfiguration(format!(
                "buffer capacity {} is outside the allowed range [{}, {}]",
                bytes,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(BufferCapacity(bytes))
    }

    /// Creates a capacity from a MiB count.
    pub fn from_mib(mib: u64) -> Result<Self, IngestError> {
        Self::new(mib * 1024 * 1024)
    }

    /// The capacity in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// The capacity as a usize, for indexing payload slices.
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl Default for BufferCapacity {
    fn default() -> Self {
        BufferCapacity(Self::DEFAULT)
    }
}

impl TryFrom<u64> for BufferCapacity {
    type Error = IngestError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        BufferCapacity::new(value)
    }
}

impl From<BufferCapacity> for u64 {
    fn from(value: BufferCapacity) -> Self {
        value.0
    }
}

impl fmt::Display for BufferCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1024 * 1024 {
            write!(f, "{:.1}MiB", self.0 as f64 / (1024.0 * 1024.0))
        } else {
            write!(f, "{:.1}KiB", self.0 as f64 / 1024.0)
        }
    }
}
