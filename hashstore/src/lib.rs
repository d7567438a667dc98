// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hashstore
//!
//! A content-addressed file ingestion engine. An incoming file is read once;
//! a set of independent byte-consumers (hash workers and a magic-number /
//! MIME classifier) observe every chunk in lock-step through shared
//! fan-out buffers; the file is then committed into a deterministic,
//! hash-sharded directory tree that acts as a local object store.
//!
//! ## Architecture
//!
//! The crate follows the layered layout of its sibling projects:
//!
//! - **Infrastructure** ([`infrastructure`]): shared-memory fan-out buffers
//!   and their barrier synchronizers, the pipeline runtime with its producer
//!   and consumers, the directory store, configuration, and logging.
//! - **Application** ([`application`]): the ingest orchestration that wires
//!   pipeline → admission → commit, and the single-context multi-hash file
//!   hasher used for batch work and as a reference implementation.
//! - **Domain** (`hashstore-domain`): value objects, the consumer contract,
//!   incremental digest state, and the error hierarchy.
//!
//! ## Data Flow
//!
//! ```text
//! source file ──▶ FileReader ──▶ fan-out buffers ──▶ N consumers
//!                     │          (barrier rounds)        │
//!                     └────────────── reports ───────────┘
//!                                       │
//!                              MetadataReport (size, digests, magic, mime)
//!                                       │
//!                            DirectoryFileStore::add_file(key, size)
//! ```

pub mod application;
pub mod infrastructure;

// Re-export the surface most callers need
pub use application::services::{FileHasher, HasherConfig, IngestOutcome, IngestService};
pub use infrastructure::pipeline::{FanoutPipeline, PipelineOptions};
pub use infrastructure::store::{DirectoryFileStore, StoreOptions};

pub use hashstore_domain::{
    BufferCapacity, ChunkConsumer, ConsumerReport, HashAlgorithm, HashFunction, IngestError,
    MetadataReport, SizeCode, StoreKey,
};
