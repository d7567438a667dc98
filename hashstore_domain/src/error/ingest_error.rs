// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error hierarchy for the ingestion engine. It
//! categorizes failures, provides actionable error messages, and supports
//! both automated handling and human-readable diagnostics.
//!
//! ## Error Architecture
//!
//! The error system organizes failures into logical categories:
//!
//! ### Input Validation Errors
//! - **InvalidPath**: identifier too short or otherwise unusable as a path
//! - **InvalidFileSize**: a byte count that cannot be encoded or stored
//! - **InvalidConfiguration**: malformed or out-of-range settings
//! - **ValidationError**: generic value errors (e.g. non-hex identifiers)
//!
//! ### Store Errors
//! - **InvalidFile**: the ingest source is not a regular file
//! - **InvalidDirectory**: the destination's parent directory is missing,
//!   which almost always means the store was never initialized
//!
//! ### Pipeline Errors
//! - **SharedMemory**: a shared region could not be created or attached
//! - **Timeout**: a barrier wait elapsed; the run is aborted
//! - **SizeMismatch**: a consumer observed a different byte count than the
//!   producer
//! - **WorkerFault**: a peer exited without producing a usable report
//!
//! ### Infrastructure Errors
//! - **Io**: file system failures (reads, renames, metadata)
//! - **ResourceExhausted**: admission control rejected the ingest
//! - **Internal**: unexpected conditions that indicate a bug
//!
//! ## Error Handling Strategy
//!
//! Validation errors are reported synchronously before any work starts.
//! Resource and I/O errors are fatal to the current run; teardown still
//! runs and the error is surfaced to the caller. Duplicate commits are not
//! errors at all; the store deduplicates silently.

use thiserror::Error;

/// Domain-specific errors for the content-addressed ingestion engine.
///
/// Each variant carries a descriptive message. Variants are grouped by the
/// surface that raises them: input validation, the directory store, the
/// fan-out pipeline, and the host system.
///
/// ## Design Principles
///
/// - **Specific**: each variant represents one failure mode
/// - **Actionable**: messages carry enough context for debugging
/// - **Categorized**: [`IngestError::category`] groups variants for
///   systematic handling
/// - **Recoverable**: some variants indicate retry-able conditions, see
///   [`IngestError::is_recoverable`]
#[derive(Error, Debug, Clone)]
pub enum IngestError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("Invalid file size: {0}")]
    InvalidFileSize(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Shared memory error: {0}")]
    SharedMemory(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Size mismatch: {0}")]
    SizeMismatch(String),

    #[error("Worker fault: {0}")]
    WorkerFault(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new shared-memory error
    pub fn shared_memory(msg: impl Into<String>) -> Self {
        Self::SharedMemory(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a new processing error
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Creates a new resource exhausted error
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Checks if the error is recoverable
    ///
    /// Recoverable errors indicate temporary conditions; a retry of the
    /// whole ingest may succeed. Validation errors never are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::Timeout(_) | IngestError::ResourceExhausted(_) | IngestError::Io(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            IngestError::InvalidConfiguration(_) => "configuration",
            IngestError::InvalidFile(_) => "validation",
            IngestError::InvalidDirectory(_) => "store",
            IngestError::InvalidFileSize(_) => "validation",
            IngestError::InvalidPath(_) => "validation",
            IngestError::SharedMemory(_) => "resource",
            IngestError::Timeout(_) => "timeout",
            IngestError::SizeMismatch(_) => "pipeline",
            IngestError::WorkerFault(_) => "pipeline",
            IngestError::ProcessingFailed(_) => "processing",
            IngestError::ResourceExhausted(_) => "resource",
            IngestError::Io(_) => "io",
            IngestError::SerializationError(_) => "serialization",
            IngestError::ValidationError(_) => "validation",
            IngestError::Internal(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::SerializationError(err.to_string())
    }
}
