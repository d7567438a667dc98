// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hashstore Domain
//!
//! The hashstore domain represents the core business logic of the
//! content-addressed ingestion engine. It is completely independent of
//! external concerns like shared memory, the filesystem, or the command-line
//! interface; those live in the `hashstore` crate.
//!
//! ## Module Structure
//!
//! - [`error`]: the [`IngestError`] hierarchy shared by every layer
//! - [`value_objects`]: immutable, self-validating domain values
//! - [`services`]: stateless domain services and the consumer contract
//!
//! ## Value Objects
//!
//! Value objects are immutable and defined by their attributes; two with the
//! same attributes are equal. They enforce the domain's invariants at
//! construction time:
//!
//! - [`HashAlgorithm`]: the closed set of digest labels the system offers
//! - [`StoreKey`]: a validated lower-case hex identifier used as routing key
//! - [`SizeCode`]: the compact base-32 encoding of a byte count
//! - [`BufferCapacity`]: a validated fan-out buffer payload capacity
//!
//! ## Domain Services
//!
//! - [`ChunkConsumer`]: the `on_start` / `on_chunk` / `on_end` contract any
//!   stream consumer must satisfy to be pluggable into the fan-out
//! - [`HashFunction`]: the single dispatch point over the closed algorithm
//!   set, holding incremental digest state
//! - [`MetadataReport`]: the merged per-file metadata record
//!
//! ## Business Rules and Invariants
//!
//! - A store key is valid hex and strictly longer than the directory depth
//!   it shards into.
//! - A size code round-trips: `decode(encode(s)) == s` for every byte count.
//! - Unknown hash labels are rejected at the configuration boundary, never
//!   at stream time.
//! - Consumer reports always carry the number of bytes the consumer
//!   observed; the runtime cross-checks them against the producer.

pub mod error;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
pub use error::IngestError;
pub use services::{ChunkConsumer, ConsumerReport, HashFunction, MetadataReport};
pub use value_objects::{BufferCapacity, HashAlgorithm, SizeCode, StoreKey};
