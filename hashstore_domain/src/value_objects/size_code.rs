// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Size Code Value Object
//!
//! This module provides the [`SizeCode`] value object: the compact string
//! form of a non-negative byte count, used as a file extension in the
//! directory store so that `(key, size)` is recoverable from the on-disk
//! path alone.
//!
//! ## Encoding
//!
//! The default alphabet is base-32 over `0-9` followed by `a-v`, produced by
//! repeated division with the most significant digit first. Examples:
//!
//! - `0` → `"0"` (the single-character zero of the alphabet)
//! - `123` → `"3r"` (`3 * 32 + 27`, `27 → 'r'`)
//! - `1024` → `"100"`
//!
//! Decoding is the exact inverse: `SizeCode::decode(encode(s)) == s` for
//! every `s`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// The base-32 alphabet: digits then lower-case `a` through `v`.
const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// The encoded form of a byte count, suitable for use as a file extension.
///
/// A size code is immutable and canonical: it never carries leading zeros
/// (except for the value zero itself) and only contains alphabet
/// characters. Construction is through [`SizeCode::encode`] or, for strings
/// read back from disk, [`SizeCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeCode(String);

impl SizeCode {
    /// Encodes a byte count into its canonical base-32 form.
    pub fn encode(size: u64) -> Self {
        if size == 0 {
            return SizeCode("0".to_string());
        }
        let mut digits = Vec::new();
        let base = ALPHABET.len() as u64;
        let mut rest = size;
        while rest > 0 {
            digits.push(ALPHABET[(rest % base) as usize]);
            rest /= base;
        }
        digits.reverse();
        // Alphabet bytes are ASCII, so this cannot fail.
        SizeCode(String::from_utf8(digits).expect("base-32 alphabet is ASCII"))
    }

    /// Parses a string previously produced by [`SizeCode::encode`].
    ///
    /// # Errors
    /// Returns `IngestError::InvalidFileSize` for empty strings, characters
    /// outside the alphabet, or non-canonical leading zeros.
    pub fn parse(text: impl AsRef<str>) -> Result<Self, IngestError> {
        let text = text.as_ref();
        if text.is_empty() {
            return Err(IngestError::InvalidFileSize(
                "size code must not be empty".to_string(),
            ));
        }
        if text.len() > 1 && text.starts_with('0') {
            return Err(IngestError::InvalidFileSize(format!(
                "size code '{}' has leading zeros",
                text
            )));
        }
        if !text.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(IngestError::InvalidFileSize(format!(
                "size code '{}' contains characters outside the 0-9a-v alphabet",
                text
            )));
        }
        Ok(SizeCode(text.to_string()))
    }

    /// Decodes the code back to the byte count it encodes.
    pub fn decode(&self) -> u64 {
        let base = ALPHABET.len() as u64;
        self.0.bytes().fold(0u64, |acc, b| {
            let digit = ALPHABET.iter().position(|a| *a == b).expect("validated digit") as u64;
            acc * base + digit
        })
    }

    /// The encoded text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
