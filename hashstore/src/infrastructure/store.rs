// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Directory Store
//!
//! The content-addressed, hash-sharded on-disk object store that receives
//! files at the end of an ingest.

pub mod directory_store;

pub use directory_store::{DirectoryFileStore, StoreOptions};
