// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Configuration
//!
//! TOML-backed configuration for the ingestion engine. A config file has
//! two tables, both optional; missing values fall back to the documented
//! defaults:
//!
//! ```toml
//! [store]
//! root = "/var/lib/hashstore"
//! dir_depth = 4
//! max_files = 999999999
//! min_free_percent = 20.0
//! max_file_size = 137438953472
//!
//! [pipeline]
//! buffer_count = 2
//! buffer_capacity = 134217728
//! timeout_secs = 60
//! hashes = ["md5", "sha1", "sha256"]
//! magic = true
//! mime = true
//! identifier = "sha256"
//! ```
//!
//! Validation happens at load time: unknown hash labels, out-of-range
//! capacities, and a missing store root are configuration errors, reported
//! before any pipeline or store work starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hashstore_domain::{BufferCapacity, HashAlgorithm, IngestError};

use crate::infrastructure::pipeline::PipelineOptions;
use crate::infrastructure::store::StoreOptions;

/// The `[store]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub root: PathBuf,
    pub dir_depth: usize,
    pub max_files: u64,
    pub min_free_percent: f64,
    pub max_file_size: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let defaults = StoreOptions::new(PathBuf::from("hashstore-data"));
        StoreSettings {
            root: defaults.root,
            dir_depth: defaults.dir_depth,
            max_files: defaults.max_files,
            min_free_percent: defaults.min_free_percent,
            max_file_size: defaults.max_file_size,
        }
    }
}

impl StoreSettings {
    /// Converts into the store's option struct.
    pub fn to_options(&self) -> StoreOptions {
        StoreOptions {
            root: self.root.clone(),
            dir_depth: self.dir_depth,
            max_files: self.max_files,
            min_free_percent: self.min_free_percent,
            max_file_size: self.max_file_size,
        }
    }
}

/// The `[pipeline]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub buffer_count: usize,
    pub buffer_capacity: u64,
    pub timeout_secs: u64,
    pub hashes: Vec<String>,
    pub magic: bool,
    pub mime: bool,
    pub identifier: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            buffer_count: 2,
            buffer_capacity: BufferCapacity::DEFAULT,
            timeout_secs: 60,
            hashes: vec!["md5".to_string(), "sha1".to_string(), "sha256".to_string()],
            magic: true,
            mime: true,
            identifier: "sha256".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Converts into the runtime's option struct, validating the capacity.
    pub fn to_options(&self) -> Result<PipelineOptions, IngestError> {
        Ok(PipelineOptions {
            buffer_count: self.buffer_count,
            buffer_capacity: BufferCapacity::new(self.buffer_capacity)?,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    /// The identifier algorithm used as the store key.
    pub fn identifier_algorithm(&self) -> Result<HashAlgorithm, IngestError> {
        self.identifier.parse()
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub store: StoreSettings,
    pub pipeline: PipelineSettings,
}

impl IngestConfig {
    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            IngestError::InvalidConfiguration(format!(
                "cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: IngestConfig = toml::from_str(&text).map_err(|e| {
            IngestError::InvalidConfiguration(format!(
                "cannot parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints without touching the filesystem.
    pub fn validate(&self) -> Result<(), IngestError> {
        BufferCapacity::new(self.pipeline.buffer_capacity)?;
        self.pipeline.identifier_algorithm()?;
        if self.pipeline.timeout_secs == 0 {
            return Err(IngestError::invalid_config("pipeline timeout must be non-zero"));
        }
        if self.store.root.as_os_str().is_empty() {
            return Err(IngestError::invalid_config("store root must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests default construction.
    ///
    /// Validates that:
    /// - Defaults validate cleanly
    /// - The default hash set matches the historical selection
    #[test]
    fn test_defaults_validate() {
        let config = IngestConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pipeline.hashes, vec!["md5", "sha1", "sha256"]);
        assert_eq!(
            config.pipeline.identifier_algorithm().unwrap(),
            HashAlgorithm::Sha256
        );
    }

    /// Tests TOML parsing with partial tables.
    ///
    /// Validates that:
    /// - Missing keys fall back to defaults
    /// - Provided keys override them
    #[test]
    fn test_partial_toml() {
        let config: IngestConfig = toml::from_str(
            r#"
            [store]
            root = "/tmp/store"
            dir_depth = 6

            [pipeline]
            hashes = ["sha512"]
            mime = false
            "#,
        )
        .unwrap();

        assert_eq!(config.store.root, PathBuf::from("/tmp/store"));
        assert_eq!(config.store.dir_depth, 6);
        assert_eq!(config.store.max_files, 999_999_999);
        assert_eq!(config.pipeline.hashes, vec!["sha512"]);
        assert!(config.pipeline.magic);
        assert!(!config.pipeline.mime);
    }

    /// Tests validation failures.
    ///
    /// Validates that:
    /// - An unknown identifier algorithm is rejected
    /// - A zero timeout is rejected
    #[test]
    fn test_validation_failures() {
        let mut config = IngestConfig::default();
        config.pipeline.identifier = "whirlpool".to_string();
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.pipeline.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
