// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Incremental Hash State
//!
//! This module provides [`HashFunction`], the single dispatch point over the
//! closed algorithm set. Callers construct one per requested
//! [`HashAlgorithm`], feed it payload slices as they arrive, and finalize to
//! a lower-case hex digest.
//!
//! Dispatch happens exactly once, at construction; the per-chunk `update`
//! path is a direct call into the selected digest implementation. This
//! replaces the historical string-keyed constructor lookup: an unknown label
//! can no longer reach stream time.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::HashAlgorithm;

/// Incremental digest state for one algorithm.
///
/// The state is cheap to construct and single-use: `finalize_hex` consumes
/// it. Memory usage is constant regardless of how many bytes are fed.
///
/// # Examples
///
/// ```
/// use hashstore_domain::{HashAlgorithm, HashFunction};
///
/// let mut hasher = HashFunction::new(HashAlgorithm::Sha256);
/// hasher.update(b"hello ");
/// hasher.update(b"world");
/// let digest = hasher.finalize_hex();
/// assert_eq!(digest.len(), 64);
/// ```
pub enum HashFunction {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl HashFunction {
    /// Creates fresh digest state for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => HashFunction::Md5(Md5::new()),
            HashAlgorithm::Sha1 => HashFunction::Sha1(Sha1::new()),
            HashAlgorithm::Sha224 => HashFunction::Sha224(Sha224::new()),
            HashAlgorithm::Sha256 => HashFunction::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => HashFunction::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => HashFunction::Sha512(Sha512::new()),
        }
    }

    /// The algorithm this state belongs to.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            HashFunction::Md5(_) => HashAlgorithm::Md5,
            HashFunction::Sha1(_) => HashAlgorithm::Sha1,
            HashFunction::Sha224(_) => HashAlgorithm::Sha224,
            HashFunction::Sha256(_) => HashAlgorithm::Sha256,
            HashFunction::Sha384(_) => HashAlgorithm::Sha384,
            HashFunction::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    /// Feeds a payload slice into the running digest.
    pub fn update(&mut self, payload: &[u8]) {
        match self {
            HashFunction::Md5(h) => h.update(payload),
            HashFunction::Sha1(h) => h.update(payload),
            HashFunction::Sha224(h) => h.update(payload),
            HashFunction::Sha256(h) => h.update(payload),
            HashFunction::Sha384(h) => h.update(payload),
            HashFunction::Sha512(h) => h.update(payload),
        }
    }

    /// Consumes the state and returns the lower-case hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            HashFunction::Md5(h) => hex::encode(h.finalize()),
            HashFunction::Sha1(h) => hex::encode(h.finalize()),
            HashFunction::Sha224(h) => hex::encode(h.finalize()),
            HashFunction::Sha256(h) => hex::encode(h.finalize()),
            HashFunction::Sha384(h) => hex::encode(h.finalize()),
            HashFunction::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}
