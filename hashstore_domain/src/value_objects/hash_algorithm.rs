// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hash Algorithm Value Object
//!
//! This module provides the [`HashAlgorithm`] value object: the closed set of
//! digest algorithms the ingestion engine offers. Every place that used to
//! dispatch on a free-form string label dispatches on this enum instead, so
//! unknown labels are rejected at the configuration boundary and never reach
//! stream time.
//!
//! ## Supported Algorithms
//!
//! | Label    | Digest width (hex chars) |
//! |----------|--------------------------|
//! | `md5`    | 32                       |
//! | `sha1`   | 40                       |
//! | `sha224` | 56                       |
//! | `sha256` | 64                       |
//! | `sha384` | 96                       |
//! | `sha512` | 128                      |
//!
//! Labels are lower-case and stable: they are used as report keys and in
//! configuration files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// The closed set of digest algorithms available to consumers.
///
/// This is a value object: algorithms are compared by value, serialize to
/// their lower-case labels, and carry no state. The incremental digest state
/// itself lives in [`crate::services::HashFunction`].
///
/// # Examples
///
/// ```
/// use hashstore_domain::HashAlgorithm;
///
/// let algo: HashAlgorithm = "sha256".parse().unwrap();
/// assert_eq!(algo.label(), "sha256");
/// assert_eq!(algo.digest_hex_len(), 64);
/// assert!("blake3".parse::<HashAlgorithm>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// All algorithms the system provides, in label order.
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// The stable lower-case label used in reports and configuration.
    pub fn label(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest this algorithm produces.
    pub fn digest_hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha224 => 56,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HashAlgorithm {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(IngestError::InvalidConfiguration(format!(
                "unknown hash label '{}', expected one of: md5, sha1, sha224, sha256, sha384, sha512",
                other
            ))),
        }
    }
}
