// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Service
//!
//! One ingest end to end: run the fan-out metadata pipeline over the source
//! file, take the configured identifier digest as the store key and the
//! observed byte count as the size, check admission, and commit the file
//! into the directory store. Each ingest is its own unit; there are no
//! transactional guarantees across files.
//!
//! The identifier algorithm (default SHA-256) is force-added to the
//! requested hash set: the commit cannot proceed without its digest, so
//! callers cannot accidentally configure it away.

use std::path::{Path, PathBuf};

use hashstore_domain::{HashAlgorithm, IngestError, MetadataReport};

use crate::infrastructure::pipeline::FanoutPipeline;
use crate::infrastructure::store::DirectoryFileStore;

/// What an ingest produced: the merged metadata report, the path the file
/// now lives at, and whether this call physically placed it (false means
/// the store already had the content and deduplicated).
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub report: MetadataReport,
    pub stored_path: PathBuf,
    pub newly_stored: bool,
}

/// Pipeline → admission → commit orchestration.
///
/// Holds the pipeline runtime and the store; the per-call metadata set is
/// supplied by the caller so one service instance can serve differently
/// configured ingests.
pub struct IngestService {
    pipeline: FanoutPipeline,
    store: DirectoryFileStore,
    identifier: HashAlgorithm,
}

impl IngestService {
    /// Creates the service over an allocated pipeline and store.
    pub fn new(
        pipeline: FanoutPipeline,
        store: DirectoryFileStore,
        identifier: HashAlgorithm,
    ) -> Self {
        IngestService {
            pipeline,
            store,
            identifier,
        }
    }

    /// The store this service commits into.
    pub fn store(&self) -> &DirectoryFileStore {
        &self.store
    }

    /// Ingests one file.
    ///
    /// # Errors
    /// - pipeline failures propagate as-is (I/O, shared memory, timeouts,
    ///   byte-count mismatches)
    /// - `IngestError::ResourceExhausted` when admission rejects the file;
    ///   the source is left in place
    /// - store failures propagate as-is; the source is left in place on
    ///   commit failure
    pub fn ingest(
        &self,
        source: &Path,
        hashes: &[String],
        want_magic: bool,
        want_mime: bool,
    ) -> Result<IngestOutcome, IngestError> {
        let mut labels: Vec<String> = hashes.to_vec();
        let identifier_label = self.identifier.label().to_string();
        if !labels.contains(&identifier_label) {
            labels.push(identifier_label);
        }

        let report = self.pipeline.hash_file(source, &labels, want_magic, want_mime)?;

        let key = report.digest(self.identifier).ok_or_else(|| {
            IngestError::internal_error(format!(
                "pipeline report is missing the '{}' identifier digest",
                self.identifier
            ))
        })?;
        let key = key.to_string();
        let size = report.size;

        if !self.store.can_store(size)? {
            return Err(IngestError::ResourceExhausted(format!(
                "store admission rejected '{}' ({} bytes)",
                source.display(),
                size
            )));
        }

        let pre_existing = self.store.has_file(&key, size)?;
        self.store.add_file(source, &key, size)?;
        let stored_path = self.store.file_path(&key, size)?;

        tracing::info!(
            source = %report.path().display(),
            stored = %stored_path.display(),
            size,
            deduplicated = pre_existing,
            "ingest complete"
        );

        Ok(IngestOutcome {
            report,
            stored_path,
            newly_stored: !pre_existing,
        })
    }
}
