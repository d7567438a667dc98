// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Key Value Object
//!
//! This module provides the [`StoreKey`] value object: the content identifier
//! under which a file is placed in the directory store. A store key is a
//! lower-case hex string (typically a cryptographic digest of the file,
//! though the store never verifies that) used both as the content's name and
//! as the routing key into the hash-sharded directory tree.
//!
//! ## Invariants
//!
//! - The key is non-empty, valid hexadecimal, and normalized to lower case.
//! - To shard at directory depth `D`, the key must be strictly longer than
//!   `D`: the first `D` characters become directory levels, the remainder
//!   becomes the leaf file name.
//!
//! ## Usage
//!
//! ```
//! use hashstore_domain::StoreKey;
//!
//! let key = StoreKey::new("56BB3d0a2a7f").unwrap();
//! assert_eq!(key.as_str(), "56bb3d0a2a7f");
//!
//! let (shards, leaf) = key.split_at_depth(4).unwrap();
//! assert_eq!(shards, ['5', '6', 'b', 'b']);
//! assert_eq!(leaf, "3d0a2a7f");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// A validated lower-case hex identifier for a stored file.
///
/// Store keys are immutable value objects: construction normalizes the input
/// to lower case and rejects anything that is not hexadecimal. Splitting the
/// key for a given directory depth is a pure operation and fails when the key
/// is too short to leave a non-empty leaf name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    /// Creates a store key from a hex string, normalizing to lower case.
    ///
    /// # Errors
    /// Returns `IngestError::ValidationError` when the input is empty or
    /// contains a non-hex character.
    pub fn new(key: impl AsRef<str>) -> Result<Self, IngestError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(IngestError::ValidationError(
                "store key must be a non-empty hex string".to_string(),
            ));
        }
        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IngestError::ValidationError(format!(
                "store key must be a hex string, got '{}'",
                key
            )));
        }
        Ok(StoreKey(key.to_ascii_lowercase()))
    }

    /// The normalized key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of hex characters in the key.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the key holds no characters. Construction forbids this, so
    /// it only exists to satisfy the usual `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits the key into `depth` shard characters and the leaf remainder.
    ///
    /// The shard characters name one directory level each; the remainder is
    /// the leaf file stem. The key must be strictly longer than `depth` so
    /// the leaf name is never empty.
    ///
    /// # Errors
    /// Returns `IngestError::InvalidPath` when `len() <= depth`.
    pub fn split_at_depth(&self, depth: usize) -> Result<(Vec<char>, &str), IngestError> {
        if self.0.len() <= depth {
            return Err(IngestError::InvalidPath(format!(
                "store key must be longer than the directory depth {} (got {} characters)",
                depth,
                self.0.len()
            )));
        }
        let shards: Vec<char> = self.0.chars().take(depth).collect();
        Ok((shards, &self.0[depth..]))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests store key validation rules.
    ///
    /// Validates that:
    /// - Valid hex strings are accepted and lower-cased
    /// - Empty strings are rejected
    /// - Non-hex characters are rejected
    #[test]
    fn test_store_key_validation() {
        let key = StoreKey::new("ABCDEF0123").unwrap();
        assert_eq!(key.as_str(), "abcdef0123");

        assert!(StoreKey::new("").is_err());
        assert!(StoreKey::new("xyz123").is_err());
        assert!(StoreKey::new("56bb 3d").is_err());
    }

    /// Tests key splitting at a directory depth.
    ///
    /// Validates that:
    /// - The first `depth` characters become shard digits
    /// - The remainder becomes the leaf stem
    /// - A key exactly `depth` long is rejected
    /// - A key one character longer is accepted
    #[test]
    fn test_split_at_depth() {
        let key = StoreKey::new("56bb3d0a").unwrap();
        let (shards, leaf) = key.split_at_depth(4).unwrap();
        assert_eq!(shards, vec!['5', '6', 'b', 'b']);
        assert_eq!(leaf, "3d0a");

        let exact = StoreKey::new("56bb").unwrap();
        assert!(matches!(
            exact.split_at_depth(4),
            Err(IngestError::InvalidPath(_))
        ));

        let one_longer = StoreKey::new("56bb3").unwrap();
        let (_, leaf) = one_longer.split_at_depth(4).unwrap();
        assert_eq!(leaf, "3");
    }
}
