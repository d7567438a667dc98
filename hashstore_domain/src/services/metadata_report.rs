// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Report
//!
//! This module provides [`MetadataReport`], the merged per-file metadata
//! record produced by one ingest. The producer contributes the
//! authoritative `size` and `path`; consumers contribute labeled entries
//! (one hex digest per requested hash label, and optionally a content
//! description and MIME type from the classifier).
//!
//! ## Merge Semantics
//!
//! Consumer labels may only *add* keys. A label that collides with an
//! existing entry is ignored: the first writer wins, and the producer's
//! fields can never be shadowed by a consumer. This keeps the merge
//! deterministic regardless of consumer completion order (the runtime merges
//! in a stable order anyway).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConsumerReport, HashAlgorithm};

/// Label under which the classifier reports a human-readable description.
pub const MAGIC_LABEL: &str = "magic";

/// Label under which the classifier reports a MIME type.
pub const MIME_LABEL: &str = "mime";

/// The merged metadata record for one ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataReport {
    /// Total bytes observed by the producer. Authoritative.
    pub size: u64,
    /// The source path the producer read.
    pub path: PathBuf,
    /// Labeled consumer entries: digests, content description, MIME type.
    pub labels: BTreeMap<String, String>,
}

impl MetadataReport {
    /// Creates a report seeded with the producer's authoritative fields.
    pub fn new(size: u64, path: impl Into<PathBuf>) -> Self {
        MetadataReport {
            size,
            path: path.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Merges one consumer's labels into the record.
    ///
    /// Existing keys are kept; consumer labels only add.
    pub fn absorb(&mut self, report: &ConsumerReport) {
        for (key, value) in &report.labels {
            self.labels.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    /// The hex digest recorded for an algorithm, if it was requested.
    pub fn digest(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.labels.get(algorithm.label()).map(String::as_str)
    }

    /// The human-readable content description, if the classifier ran.
    pub fn magic(&self) -> Option<&str> {
        self.labels.get(MAGIC_LABEL).map(String::as_str)
    }

    /// The MIME type, if the classifier ran.
    pub fn mime(&self) -> Option<&str> {
        self.labels.get(MIME_LABEL).map(String::as_str)
    }

    /// The source path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
