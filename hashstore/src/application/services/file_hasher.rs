// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Single-Context File Hasher
//!
//! The simple hasher: one thread, one read pass, every selected digest fed
//! from the same buffer. It does not use the fan-out; it exists for batch
//! work where process-level parallelism across *files* (via Rayon) beats
//! fan-out parallelism within one file, and it doubles as the
//! single-threaded reference the pipeline is validated against.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use hashstore_domain::{HashAlgorithm, HashFunction, IngestError, MetadataReport};

/// Configuration for the single-context hasher.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Digests to compute. Duplicates are ignored; order does not matter.
    pub algorithms: Vec<HashAlgorithm>,
    /// Read-buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for HasherConfig {
    fn default() -> Self {
        HasherConfig {
            algorithms: vec![HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha256],
            buffer_size: 128 * 1024,
        }
    }
}

/// Streaming multi-hash over single files and batches.
#[derive(Debug, Clone)]
pub struct FileHasher {
    config: HasherConfig,
}

impl FileHasher {
    /// Creates a hasher with the given configuration.
    ///
    /// # Errors
    /// Returns `IngestError::InvalidConfiguration` for a zero buffer size.
    pub fn new(config: HasherConfig) -> Result<Self, IngestError> {
        if config.buffer_size == 0 {
            return Err(IngestError::invalid_config("hasher buffer size must be non-zero"));
        }
        Ok(FileHasher { config })
    }

    /// Creates a hasher with the default configuration.
    pub fn new_default() -> Self {
        FileHasher {
            config: HasherConfig::default(),
        }
    }

    /// The configured algorithm selection, deduplicated and ordered.
    pub fn algorithms(&self) -> Vec<HashAlgorithm> {
        let mut algorithms = self.config.algorithms.clone();
        algorithms.sort();
        algorithms.dedup();
        algorithms
    }

    /// Hashes one file in a single read pass.
    ///
    /// Every selected digest is updated from the same read buffer, so the
    /// file is read exactly once regardless of how many algorithms are
    /// selected.
    pub fn hash_file(&self, path: &Path) -> Result<MetadataReport, IngestError> {
        let mut file = File::open(path).map_err(|e| {
            IngestError::InvalidFile(format!("cannot open '{}': {}", path.display(), e))
        })?;

        let mut hashers: Vec<HashFunction> =
            self.algorithms().into_iter().map(HashFunction::new).collect();

        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut total: u64 = 0;
        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(IngestError::Io(format!(
                        "read failed on '{}': {}",
                        path.display(),
                        e
                    )))
                }
            };
            for hasher in &mut hashers {
                hasher.update(&buffer[..n]);
            }
            total += n as u64;
        }

        let mut report = MetadataReport::new(total, path);
        for hasher in hashers {
            let algorithm = hasher.algorithm();
            report
                .labels
                .insert(algorithm.label().to_string(), hasher.finalize_hex());
        }
        Ok(report)
    }

    /// Hashes a batch of files across the Rayon pool.
    ///
    /// Results come back in input order; each file carries its own result
    /// so one unreadable file does not fail the batch.
    pub fn hash_many(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<MetadataReport, IngestError>)> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.hash_file(path)))
            .collect()
    }
}
