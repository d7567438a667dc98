// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Shared utilities for integration and end-to-end tests.

#![allow(dead_code)] // not every test binary uses every helper

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hashstore::{BufferCapacity, FanoutPipeline, PipelineOptions};

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).expect("create test source");
    file.write_all(bytes).expect("write test source");
    path
}

/// Deterministic pseudo-random payload of `len` bytes.
///
/// A fixed-seed LCG keeps the content stable across runs while still
/// exercising every byte value.
pub fn random_payload(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x243F_6A88_85A3_08D3;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

/// A fan-out pipeline sized for tests: two small buffers, short timeout.
pub fn small_pipeline() -> FanoutPipeline {
    FanoutPipeline::new(PipelineOptions {
        buffer_count: 2,
        buffer_capacity: BufferCapacity::new(BufferCapacity::MIN).unwrap(),
        timeout: Duration::from_secs(5),
    })
    .expect("allocate test pipeline")
}

/// Calculate the SHA-256 digest of data, hex-encoded.
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = hashstore::HashFunction::new(hashstore::HashAlgorithm::Sha256);
    hasher.update(data);
    hasher.finalize_hex()
}
