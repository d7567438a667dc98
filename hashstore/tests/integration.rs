// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Integration Tests
//!
//! Exercises the directory store through its public surface: path
//! derivation, initialization, deduplication, admission, and removal.

mod common;

use std::path::Path;

use hashstore::{DirectoryFileStore, HashAlgorithm, IngestError, IngestService, StoreOptions};

use common::{calculate_sha256, small_pipeline, write_source};

fn initialized_store(root: &Path, dir_depth: usize) -> DirectoryFileStore {
    let store = DirectoryFileStore::new(StoreOptions {
        dir_depth,
        min_free_percent: 0.0,
        ..StoreOptions::new(root)
    })
    .expect("create store");
    store.init_store().expect("init store");
    store
}

/// Tests the depth-6 path derivation scenario.
///
/// Validates that:
/// - The documented key/size pair derives the documented path
/// - The `.3r` suffix is the base-32 form of 123
#[test]
fn test_path_derivation_depth_six() {
    let root = tempfile::tempdir().unwrap();
    let store = DirectoryFileStore::new(StoreOptions {
        dir_depth: 6,
        ..StoreOptions::new(root.path())
    })
    .unwrap();

    let path = store
        .file_path(
            "56bb3d0a2a7f294967f02dbc2de2a403ae3ba98b124d840273a6e46e081cf67c",
            123,
        )
        .unwrap();

    let expected = root
        .path()
        .join("5/6/b/b/3/d/0a2a7f294967f02dbc2de2a403ae3ba98b124d840273a6e46e081cf67c.3r");
    assert_eq!(path, expected);
}

/// Tests initialization against a pre-populated tree.
///
/// Validates that:
/// - init_store on a fresh root creates every leaf
/// - A file placed beforehand is found and seeds the counter
#[test]
fn test_init_counts_existing_files() {
    let root = tempfile::tempdir().unwrap();
    let store = initialized_store(root.path(), 2);

    // Commit one file, then build a second store view over the same root.
    let source = write_source(root.path(), "seed", b"seed-bytes");
    store.add_file(&source, "deadbeef", 10).unwrap();

    let second_view = DirectoryFileStore::new(StoreOptions {
        dir_depth: 2,
        min_free_percent: 0.0,
        ..StoreOptions::new(root.path())
    })
    .unwrap();
    let (created, found) = second_view.init_store().unwrap();

    assert_eq!(created, 0);
    assert_eq!(found, 1);
    assert_eq!(second_view.files_stored(), 1);
    assert_eq!(second_view.count_stored().unwrap(), 1);
}

/// Tests the dedup scenario end to end.
///
/// Validates that:
/// - Two ingests of identical content leave exactly one stored copy
/// - The counter grows by exactly one over the pre-ingest baseline
/// - The second source is consumed
#[test]
fn test_dedup_scenario() {
    let root = tempfile::tempdir().unwrap();
    let store = initialized_store(root.path(), 2);
    let baseline = store.files_stored();

    let content = b"dedup target";
    let key = calculate_sha256(content);

    let first = write_source(root.path(), "copy-one", content);
    let second = write_source(root.path(), "copy-two", content);

    assert!(store.add_file(&first, &key, content.len() as u64).unwrap());
    assert!(store.add_file(&second, &key, content.len() as u64).unwrap());

    assert!(!second.exists());
    assert_eq!(store.files_stored(), baseline + 1);
    assert_eq!(store.count_stored().unwrap(), baseline + 1);
}

/// Tests the admission scenario.
///
/// Validates that:
/// - With max_files=1 and one file stored, can_store refuses
/// - A subsequent ingest through the service does not place a second file
#[test]
fn test_admission_blocks_second_file() {
    let root = tempfile::tempdir().unwrap();
    let store = DirectoryFileStore::new(StoreOptions {
        dir_depth: 2,
        max_files: 1,
        min_free_percent: 0.0,
        ..StoreOptions::new(root.path())
    })
    .unwrap();
    store.init_store().unwrap();

    let first = write_source(root.path(), "one", b"first in");
    store.add_file(&first, &calculate_sha256(b"first in"), 8).unwrap();
    assert!(!store.can_store(1).unwrap());

    let service = IngestService::new(small_pipeline(), store, HashAlgorithm::Sha256);
    let second = write_source(root.path(), "two", b"second, refused");
    let err = service.ingest(&second, &[], false, false).unwrap_err();

    assert!(matches!(err, IngestError::ResourceExhausted(_)));
    assert!(second.exists());
    assert_eq!(service.store().count_stored().unwrap(), 1);
}

/// Tests removal semantics at the integration surface.
///
/// Validates that:
/// - remove_file is idempotent (two calls, both true)
/// - The counter never underflows
#[test]
fn test_remove_idempotence() {
    let root = tempfile::tempdir().unwrap();
    let store = initialized_store(root.path(), 2);

    let content = b"short-lived";
    let key = calculate_sha256(content);
    let source = write_source(root.path(), "victim", content);
    store.add_file(&source, &key, content.len() as u64).unwrap();

    assert!(store.remove_file(&key, content.len() as u64).unwrap());
    assert!(store.remove_file(&key, content.len() as u64).unwrap());
    assert_eq!(store.files_stored(), 0);
}
