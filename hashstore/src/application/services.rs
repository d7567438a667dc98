// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Services
//!
//! - [`FileHasher`]: single-context streaming multi-hash, with a Rayon fan
//!   over file batches
//! - [`IngestService`]: one ingest end to end: metadata pipeline,
//!   admission, commit

pub mod file_hasher;
pub mod ingest_service;

pub use file_hasher::{FileHasher, HasherConfig};
pub use ingest_service::{IngestOutcome, IngestService};
