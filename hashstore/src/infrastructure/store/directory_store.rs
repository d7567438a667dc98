// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Directory File Store
//!
//! Deterministic content-addressed placement of files on a single local
//! filesystem. A file identified by hex key `K` and byte count `S` lives at
//!
//! ```text
//! root/K[0]/K[1]/…/K[D-1]/K[D:].<size-code>
//! ```
//!
//! where `D` is the configured directory depth and `<size-code>` is the
//! base-32 encoding of `S`, so `(K, S)` is recoverable from the path
//! alone. The full tree of `16^D` leaf directories is created up front by
//! [`DirectoryFileStore::init_store`]; commits only ever rename into an
//! existing leaf.
//!
//! ## Concurrency
//!
//! The store keeps no shared in-memory state beyond its configuration and
//! an advisory file counter. Writers in the same or different processes are
//! serialized per destination through an advisory lock on
//! `<destination>.lock` (lock files are excluded from every count). Within
//! the lock, a commit is a rename (atomic on one filesystem), so
//! concurrent ingests of the same content converge to exactly one copy.
//!
//! ## Admission
//!
//! [`DirectoryFileStore::can_store`] is a policy gate, not a guarantee:
//! free-space and file-count figures are sampled, and the counter is an
//! advisory hint. Layout correctness never depends on them.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;

use hashstore_domain::{IngestError, SizeCode, StoreKey};

/// Directory creation mode for the sharded tree.
const DIR_MODE: u32 = 0o740;

/// Mode applied to committed files: owner/group read-only.
const FILE_MODE: u32 = 0o440;

/// Configuration for a [`DirectoryFileStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Base directory of the store tree.
    pub root: PathBuf,
    /// Number of single-hex-character directory levels.
    pub dir_depth: usize,
    /// Maximum number of files admitted into the store.
    pub max_files: u64,
    /// Minimum free-space percentage before ingests are rejected. Values
    /// outside `[0, 100)` fall back to 5.0.
    pub min_free_percent: f64,
    /// Maximum size of a single admitted file.
    pub max_file_size: u64,
}

impl StoreOptions {
    /// Options with the standard defaults for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StoreOptions {
            root: root.into(),
            dir_depth: 4,
            max_files: 999_999_999,
            min_free_percent: 20.0,
            max_file_size: 128 * 1024 * 1024 * 1024,
        }
    }
}

/// A content-addressed, hash-sharded directory store.
///
/// See the module documentation for the layout and locking protocol.
#[derive(Debug)]
pub struct DirectoryFileStore {
    root: PathBuf,
    dir_depth: usize,
    max_files: u64,
    min_free_bytes: u64,
    max_file_size: u64,
    stored: AtomicU64,
}

impl DirectoryFileStore {
    /// Creates a store over `options.root`, creating the root directory if
    /// needed (the sharded tree itself is created by
    /// [`init_store`](Self::init_store)).
    ///
    /// # Errors
    /// Returns `IngestError::InvalidConfiguration` for a directory depth
    /// outside `[1, 8]`, and I/O errors when the root cannot be created or
    /// its filesystem cannot be queried.
    pub fn new(options: StoreOptions) -> Result<Self, IngestError> {
        if !(1..=8).contains(&options.dir_depth) {
            return Err(IngestError::InvalidConfiguration(format!(
                "directory depth must be between 1 and 8, got {}",
                options.dir_depth
            )));
        }

        fs::create_dir_all(&options.root).map_err(|e| {
            IngestError::Io(format!(
                "cannot create store root '{}': {}",
                options.root.display(),
                e
            ))
        })?;

        let min_free_percent = if (0.0..100.0).contains(&options.min_free_percent) {
            options.min_free_percent
        } else {
            5.0
        };
        let total = fs2::total_space(&options.root).map_err(|e| {
            IngestError::Io(format!(
                "cannot query filesystem of '{}': {}",
                options.root.display(),
                e
            ))
        })?;
        let min_free_bytes = ((min_free_percent / 100.0) * total as f64) as u64;

        Ok(DirectoryFileStore {
            root: options.root,
            dir_depth: options.dir_depth,
            max_files: options.max_files,
            min_free_bytes,
            max_file_size: options.max_file_size,
            stored: AtomicU64::new(0),
        })
    }

    /// The store's base directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configured directory depth.
    pub fn dir_depth(&self) -> usize {
        self.dir_depth
    }

    /// Derives the unique store path for `(key, size)`.
    ///
    /// This is a pure function of the arguments and the store
    /// configuration: repeated calls return equal paths and touch nothing
    /// on disk.
    ///
    /// # Errors
    /// - `IngestError::ValidationError` when `key` is not hex
    /// - `IngestError::InvalidPath` when `key` is not longer than the depth
    pub fn file_path(&self, key: &str, size: u64) -> Result<PathBuf, IngestError> {
        let key = StoreKey::new(key)?;
        let (shards, leaf) = key.split_at_depth(self.dir_depth)?;
        let code = SizeCode::encode(size);

        let mut path = self.root.clone();
        for shard in shards {
            path.push(shard.to_string());
        }
        path.push(format!("{}.{}", leaf, code));
        Ok(path)
    }

    /// True iff the file for `(key, size)` exists as a regular file.
    pub fn has_file(&self, key: &str, size: u64) -> Result<bool, IngestError> {
        Ok(self.file_path(key, size)?.is_file())
    }

    /// Enumerates all `16^D` leaf directories of the store tree.
    pub fn enum_sub_dirs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let depth = self.dir_depth as u32;
        (0..16u64.pow(depth)).map(move |index| {
            let mut path = self.root.clone();
            for level in (0..depth).rev() {
                let digit = (index >> (4 * level)) & 0xF;
                path.push(format!("{:x}", digit));
            }
            path
        })
    }

    /// Creates every leaf directory and seeds the file counter.
    ///
    /// Returns `(directories_created, files_found)`. Idempotent: existing
    /// directories are left alone and counted as zero created.
    pub fn init_store(&self) -> Result<(u64, u64), IngestError> {
        let mut created: u64 = 0;
        for dir in self.enum_sub_dirs() {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                set_mode(&dir, DIR_MODE)?;
                created += 1;
            }
        }

        let found = self.count_stored()?;
        self.stored.store(found, Ordering::Relaxed);
        tracing::info!(
            root = %self.root.display(),
            dirs_created = created,
            files_found = found,
            "store initialized"
        );
        Ok((created, found))
    }

    /// Counts files currently stored under the sharded scheme.
    ///
    /// Lock files (`*.lock`) are not stored content and are excluded.
    pub fn count_stored(&self) -> Result<u64, IngestError> {
        let mut count: u64 = 0;
        for dir in self.enum_sub_dirs() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(IngestError::Io(format!(
                        "cannot enumerate '{}': {}",
                        dir.display(),
                        e
                    )))
                }
            };
            for entry in entries {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name();
                if name.to_string_lossy().ends_with(".lock") {
                    continue;
                }
                count += 1;
            }
        }
        Ok(count)
    }

    /// Adds a file to the store by renaming it onto its derived path.
    ///
    /// Under the destination's advisory lock:
    /// - if the destination already exists, the source is deleted and the
    ///   call succeeds (dedup; re-ingesting identical content is not an
    ///   error);
    /// - otherwise the source is renamed onto the destination, the file
    ///   mode is restricted, and the counter is incremented.
    ///
    /// Returns `true` iff the destination exists after the call.
    ///
    /// # Errors
    /// - `IngestError::InvalidFile` when `source` is not a regular file
    /// - `IngestError::InvalidDirectory` when the destination's leaf
    ///   directory is missing, which means the store was not initialized
    /// - I/O errors from the rename itself; the counter is not mutated and
    ///   the source is left in place
    pub fn add_file(&self, source: &Path, key: &str, size: u64) -> Result<bool, IngestError> {
        if !source.is_file() {
            return Err(IngestError::InvalidFile(format!(
                "source path '{}' is not a valid file",
                source.display()
            )));
        }

        let destination = self.file_path(key, size)?;
        let parent = destination
            .parent()
            .ok_or_else(|| IngestError::internal_error("derived path has no parent"))?;
        if !parent.exists() {
            return Err(IngestError::InvalidDirectory(format!(
                "parent directory '{}' does not exist",
                parent.display()
            )));
        }

        let _lock = PathLock::acquire(&lock_path(&destination))?;

        if destination.exists() {
            // Duplicate commit: the content is already stored under this
            // identifier. Drop the redundant source.
            fs::remove_file(source)?;
            tracing::debug!(destination = %destination.display(), "duplicate ingest deduplicated");
        } else {
            fs::rename(source, &destination).map_err(|e| {
                IngestError::Io(format!(
                    "cannot move '{}' to '{}': {}",
                    source.display(),
                    destination.display(),
                    e
                ))
            })?;
            set_mode(&destination, FILE_MODE)?;
            self.stored.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(destination = %destination.display(), size, "file committed");
        }

        Ok(destination.exists())
    }

    /// Removes the file for `(key, size)` if present.
    ///
    /// Returns `true` iff the file does not exist after the call, which
    /// makes removal idempotent: removing an absent file is a successful
    /// no-op.
    pub fn remove_file(&self, key: &str, size: u64) -> Result<bool, IngestError> {
        let path = self.file_path(key, size)?;
        let parent = path
            .parent()
            .ok_or_else(|| IngestError::internal_error("derived path has no parent"))?;
        if !parent.exists() {
            // Nothing under an uninitialized shard; trivially absent.
            return Ok(true);
        }

        let _lock = PathLock::acquire(&lock_path(&path))?;

        if path.is_file() {
            fs::remove_file(&path)?;
            // Saturating: the counter is advisory and must never underflow.
            let _ = self
                .stored
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
            tracing::debug!(path = %path.display(), "file removed");
        }

        Ok(!path.exists())
    }

    /// Admission predicate: free space, file count, and size within policy.
    pub fn can_store(&self, size: u64) -> Result<bool, IngestError> {
        if self.get_free_bytes()? < self.min_free_bytes {
            return Ok(false);
        }
        if self.files_stored() >= self.max_files {
            return Ok(false);
        }
        Ok(size <= self.max_file_size)
    }

    /// Percentage of free space on the store's filesystem.
    pub fn get_free(&self) -> Result<f64, IngestError> {
        let total = fs2::total_space(&self.root)?;
        let free = fs2::available_space(&self.root)?;
        Ok((free as f64 / total as f64) * 100.0)
    }

    /// Free bytes on the store's filesystem.
    pub fn get_free_bytes(&self) -> Result<u64, IngestError> {
        Ok(fs2::available_space(&self.root)?)
    }

    /// The advisory count of files stored.
    ///
    /// Seeded by [`init_store`](Self::init_store) and maintained by
    /// add/remove; use [`count_stored`](Self::count_stored) for the
    /// authoritative on-disk figure.
    pub fn files_stored(&self) -> u64 {
        self.stored.load(Ordering::Relaxed)
    }
}

/// The advisory lock file guarding a destination path.
fn lock_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// An exclusive advisory lock held for the guard's lifetime.
///
/// The lock file itself is left in place after release; it is excluded from
/// store counts and reused by the next contender.
struct PathLock {
    file: File,
}

impl PathLock {
    fn acquire(path: &Path) -> Result<Self, IngestError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| IngestError::Io(format!("cannot open lock file '{}': {}", path.display(), e)))?;
        file.lock_exclusive()
            .map_err(|e| IngestError::Io(format!("cannot lock '{}': {}", path.display(), e)))?;
        Ok(PathLock { file })
    }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Applies a permission mode where the platform supports it.
#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), IngestError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| IngestError::Io(format!("cannot set mode on '{}': {}", path.display(), e)))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), IngestError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_store(dir_depth: usize) -> (tempfile::TempDir, DirectoryFileStore) {
        let root = tempfile::tempdir().unwrap();
        let store = DirectoryFileStore::new(StoreOptions {
            dir_depth,
            ..StoreOptions::new(root.path())
        })
        .unwrap();
        (root, store)
    }

    fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    const KEY: &str = "56bb3d0a2a7f294967f02dbc2de2a403ae3ba98b124d840273a6e46e081cf67c";

    /// Tests the documented depth-6 path derivation vector.
    ///
    /// Validates that:
    /// - Directory prefix encodes exactly the first six key characters
    /// - The leaf name is the key remainder plus the base-32 size code
    /// - Repeated calls return equal paths (purity)
    #[test]
    fn test_file_path_depth_six_vector() {
        let (_root, store) = test_store(6);

        let path = store.file_path(KEY, 123).unwrap();
        let relative = path.strip_prefix(store.root()).unwrap();
        assert_eq!(
            relative,
            Path::new("5/6/b/b/3/d/0a2a7f294967f02dbc2de2a403ae3ba98b124d840273a6e46e081cf67c.3r")
        );

        assert_eq!(path, store.file_path(KEY, 123).unwrap());
    }

    /// Tests key validation at the path boundary.
    ///
    /// Validates that:
    /// - Non-hex keys are rejected as validation errors
    /// - A key exactly as long as the depth is an InvalidPath
    /// - A key one character longer is accepted
    /// - Upper-case keys are normalized into the same path
    #[test]
    fn test_file_path_validation() {
        let (_root, store) = test_store(4);

        assert!(matches!(
            store.file_path("not-hex!", 1),
            Err(IngestError::ValidationError(_))
        ));
        assert!(matches!(
            store.file_path("abcd", 1),
            Err(IngestError::InvalidPath(_))
        ));
        assert!(store.file_path("abcde", 1).is_ok());

        assert_eq!(
            store.file_path("ABCDEF", 7).unwrap(),
            store.file_path("abcdef", 7).unwrap()
        );
    }

    /// Tests store initialization.
    ///
    /// Validates that:
    /// - A depth-2 store creates exactly 256 leaf directories
    /// - A second init creates nothing further
    /// - The seeded counter matches count_stored
    #[test]
    fn test_init_store_creates_all_leaves() {
        let (_root, store) = test_store(2);

        let (created, found) = store.init_store().unwrap();
        assert_eq!(created, 256);
        assert_eq!(found, 0);
        assert_eq!(store.enum_sub_dirs().count(), 256);
        assert!(store.enum_sub_dirs().all(|d| d.is_dir()));

        let (created_again, _) = store.init_store().unwrap();
        assert_eq!(created_again, 0);
        assert_eq!(store.files_stored(), store.count_stored().unwrap());
    }

    /// Tests the add/has/remove round trip.
    ///
    /// Validates that:
    /// - add_file commits under the derived path and bumps the counter
    /// - has_file sees the committed file
    /// - remove_file deletes it and is idempotent
    #[test]
    fn test_add_has_remove_round_trip() {
        let (root, store) = test_store(2);
        store.init_store().unwrap();

        let source = write_source(root.path(), "incoming", b"payload");
        assert!(store.add_file(&source, KEY, 7).unwrap());
        assert!(!source.exists());
        assert!(store.has_file(KEY, 7).unwrap());
        assert_eq!(store.files_stored(), 1);

        assert!(store.remove_file(KEY, 7).unwrap());
        assert!(!store.has_file(KEY, 7).unwrap());
        assert_eq!(store.files_stored(), 0);

        // Idempotent: removing the absent file still succeeds.
        assert!(store.remove_file(KEY, 7).unwrap());
        assert_eq!(store.files_stored(), 0);
    }

    /// Tests duplicate-commit deduplication.
    ///
    /// Validates that:
    /// - A second ingest under the same (key, size) unlinks its source
    /// - Exactly one copy remains and the counter grows by exactly one
    #[test]
    fn test_duplicate_ingest_deduplicates() {
        let (root, store) = test_store(2);
        store.init_store().unwrap();
        let baseline = store.files_stored();

        let first = write_source(root.path(), "first", b"same bytes");
        let second = write_source(root.path(), "second", b"same bytes");

        assert!(store.add_file(&first, KEY, 10).unwrap());
        assert!(store.add_file(&second, KEY, 10).unwrap());

        assert!(!second.exists());
        assert_eq!(store.files_stored(), baseline + 1);
        assert_eq!(store.count_stored().unwrap(), baseline + 1);
    }

    /// Tests commit against an uninitialized store.
    ///
    /// Validates that:
    /// - add_file fails with InvalidDirectory when the leaf is missing
    /// - The source file is left in place
    #[test]
    fn test_add_file_requires_initialized_store() {
        let (root, store) = test_store(2);
        let source = write_source(root.path(), "orphan", b"data");

        let err = store.add_file(&source, KEY, 4).unwrap_err();
        assert!(matches!(err, IngestError::InvalidDirectory(_)));
        assert!(source.exists());
    }

    /// Tests non-file sources.
    ///
    /// Validates that:
    /// - A directory source is rejected with InvalidFile
    /// - A missing source is rejected with InvalidFile
    #[test]
    fn test_add_file_rejects_non_files() {
        let (root, store) = test_store(2);
        store.init_store().unwrap();

        let err = store.add_file(root.path(), KEY, 1).unwrap_err();
        assert!(matches!(err, IngestError::InvalidFile(_)));

        let err = store.add_file(&root.path().join("missing"), KEY, 1).unwrap_err();
        assert!(matches!(err, IngestError::InvalidFile(_)));
    }

    /// Tests the max-files admission bound.
    ///
    /// Validates that:
    /// - With max_files=1 and one file stored, can_store refuses
    /// - The stored file itself is unaffected
    #[test]
    fn test_admission_max_files() {
        let root = tempfile::tempdir().unwrap();
        let store = DirectoryFileStore::new(StoreOptions {
            dir_depth: 2,
            max_files: 1,
            min_free_percent: 0.0,
            ..StoreOptions::new(root.path())
        })
        .unwrap();
        store.init_store().unwrap();

        assert!(store.can_store(100).unwrap());

        let source = write_source(root.path(), "only", b"x");
        store.add_file(&source, KEY, 1).unwrap();

        assert!(!store.can_store(100).unwrap());
        assert!(store.has_file(KEY, 1).unwrap());
    }

    /// Tests the max-file-size admission bound.
    ///
    /// Validates that:
    /// - Sizes at the bound are admitted, above it refused
    #[test]
    fn test_admission_max_file_size() {
        let root = tempfile::tempdir().unwrap();
        let store = DirectoryFileStore::new(StoreOptions {
            dir_depth: 2,
            max_file_size: 1024,
            min_free_percent: 0.0,
            ..StoreOptions::new(root.path())
        })
        .unwrap();

        assert!(store.can_store(1024).unwrap());
        assert!(!store.can_store(1025).unwrap());
    }

    /// Tests the zero-size boundary.
    ///
    /// Validates that:
    /// - S == 0 derives a ".0" extension and stores an empty file
    #[test]
    fn test_zero_size_file() {
        let (root, store) = test_store(2);
        store.init_store().unwrap();

        let path = store.file_path(KEY, 0).unwrap();
        assert!(path.to_string_lossy().ends_with(".0"));

        let source = write_source(root.path(), "empty", b"");
        assert!(store.add_file(&source, KEY, 0).unwrap());
        assert!(store.has_file(KEY, 0).unwrap());
    }

    /// Tests that lock files never count as stored content.
    ///
    /// Validates that:
    /// - count_stored excludes *.lock files left by the locking protocol
    #[test]
    fn test_count_excludes_lock_files() {
        let (root, store) = test_store(2);
        store.init_store().unwrap();

        let source = write_source(root.path(), "locked", b"abc");
        store.add_file(&source, KEY, 3).unwrap();

        // The commit leaves its lock file behind.
        let lock = lock_path(&store.file_path(KEY, 3).unwrap());
        assert!(lock.exists());
        assert_eq!(store.count_stored().unwrap(), 1);
    }

    proptest::proptest! {
        /// file_path is pure and the on-disk name recovers (key, size).
        #[test]
        fn prop_file_path_purity(key in "[0-9a-f]{9,64}", size in proptest::prelude::any::<u64>()) {
            let root = tempfile::tempdir().unwrap();
            let store = DirectoryFileStore::new(StoreOptions {
                dir_depth: 4,
                ..StoreOptions::new(root.path())
            })
            .unwrap();

            let first = store.file_path(&key, size).unwrap();
            let second = store.file_path(&key, size).unwrap();
            proptest::prop_assert_eq!(&first, &second);

            // The leaf name encodes exactly the key remainder and the size.
            let name = first.file_name().unwrap().to_str().unwrap();
            let (stem, code) = name.split_once('.').unwrap();
            proptest::prop_assert_eq!(stem, &key[4..]);
            proptest::prop_assert_eq!(SizeCode::parse(code).unwrap().decode(), size);
        }
    }

    /// Tests committed file permissions on Unix.
    ///
    /// Validates that:
    /// - Stored files carry mode 0440
    #[cfg(unix)]
    #[test]
    fn test_committed_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (root, store) = test_store(2);
        store.init_store().unwrap();

        let source = write_source(root.path(), "mode", b"bytes");
        store.add_file(&source, KEY, 5).unwrap();

        let committed = store.file_path(KEY, 5).unwrap();
        let mode = fs::metadata(&committed).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o440);
    }
}
