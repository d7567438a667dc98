// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fan-Out Buffer
//!
//! A fan-out buffer is a fixed-capacity shared byte region with an in-band
//! length header, addressable by a stable textual name so independent peers
//! can attach to it without sharing handles. One producer writes a chunk and
//! its length; any number of consumers take read-only snapshots of exactly
//! that chunk. The per-buffer barrier (see
//! [`super::buffer_sync`]) orders the producer's write before every
//! consumer's snapshot; the buffer itself carries no synchronization.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────┐
//! │ length (u64) │ payload (capacity bytes)                 │
//! └──────────────┴──────────────────────────────────────────┘
//!    8 bytes LE     first `length` bytes are the chunk
//! ```
//!
//! The region is a `memmap2` shared mapping of a file created under
//! `/dev/shm` when available (the system temp directory otherwise), so the
//! name outlives any single mapping and the region stays addressable across
//! process boundaries.
//!
//! ## Roles
//!
//! Exactly one participant is the **creator** and holds a [`FanoutBuffer`]:
//! it owns the name and is the only handle that can `unlink` it. Everyone
//! else holds a [`BufferHandle`] obtained by [`BufferHandle::attach`] and is
//! responsible only for closing its own mapping. Both handles release their
//! resources on drop; leaking a named region across process boundaries is a
//! correctness issue, not a hygiene issue, so the creator's drop path
//! unlinks unconditionally.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use memmap2::{MmapMut, MmapOptions};

use hashstore_domain::{BufferCapacity, IngestError};

/// Width of the in-band length header: one little-endian `u64`.
pub const LEN_HEADER: usize = std::mem::size_of::<u64>();

/// Directory in which named regions are backed.
///
/// `/dev/shm` keeps the backing pages in memory on Linux; elsewhere the
/// system temp directory is close enough for a mapped scratch region.
fn shm_dir() -> PathBuf {
    let dev_shm = PathBuf::from("/dev/shm");
    if dev_shm.is_dir() {
        dev_shm
    } else {
        std::env::temp_dir()
    }
}

/// An attached mapping of a named fan-out buffer.
///
/// A handle can write a chunk, publish its length, and take read-only
/// snapshots. It cannot remove the name from the system; that is the
/// creator's job, and the type split enforces it.
#[derive(Debug)]
pub struct BufferHandle {
    name: String,
    path: PathBuf,
    map: Option<MmapMut>,
    capacity: usize,
}

impl BufferHandle {
    /// Attaches to an existing named region.
    ///
    /// # Errors
    /// Returns `IngestError::SharedMemory` when the name does not exist or
    /// the region is too small to hold the length header.
    pub fn attach(name: &str) -> Result<Self, IngestError> {
        let path = shm_dir().join(name);
        let file = OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            IngestError::SharedMemory(format!("cannot attach to shared region '{}': {}", name, e))
        })?;
        let total = file
            .metadata()
            .map_err(|e| IngestError::SharedMemory(format!("cannot stat shared region '{}': {}", name, e)))?
            .len() as usize;
        if total < LEN_HEADER {
            return Err(IngestError::SharedMemory(format!(
                "shared region '{}' is smaller than its length header",
                name
            )));
        }
        let map = Self::map_region(&file, name)?;
        Ok(BufferHandle {
            name: name.to_string(),
            path,
            map: Some(map),
            capacity: total - LEN_HEADER,
        })
    }

    fn map_region(file: &File, name: &str) -> Result<MmapMut, IngestError> {
        // SAFETY: the mapping is file-backed and private to this handle's
        // lifetime; concurrent access is ordered by the pipeline barrier.
        unsafe { MmapOptions::new().map_mut(file) }
            .map_err(|e| IngestError::SharedMemory(format!("cannot map shared region '{}': {}", name, e)))
    }

    fn map_ref(&self) -> Result<&MmapMut, IngestError> {
        self.map
            .as_ref()
            .ok_or_else(|| IngestError::SharedMemory(format!("shared region '{}' is closed", self.name)))
    }

    /// The stable name peers attach by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload capacity in bytes (the region size minus the header).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The currently published payload length, read from the header.
    pub fn len(&self) -> Result<usize, IngestError> {
        let map = self.map_ref()?;
        let mut header = [0u8; LEN_HEADER];
        header.copy_from_slice(&map[..LEN_HEADER]);
        // Clamp: a corrupt header must not let a snapshot escape the payload.
        Ok((u64::from_le_bytes(header) as usize).min(self.capacity))
    }

    /// True when the published payload fills the whole capacity.
    pub fn is_full(&self) -> Result<bool, IngestError> {
        Ok(self.len()? >= self.capacity)
    }

    /// Writes a chunk at the payload origin and publishes its length.
    ///
    /// Copies `min(data.len(), capacity)` bytes; an oversized input is
    /// truncated, never overflowed, and the caller detects truncation by
    /// comparing the returned count to its source read size.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, IngestError> {
        let capacity = self.capacity;
        let name = self.name.clone();
        let map = self
            .map
            .as_mut()
            .ok_or_else(|| IngestError::SharedMemory(format!("shared region '{}' is closed", name)))?;
        let n = data.len().min(capacity);
        map[LEN_HEADER..LEN_HEADER + n].copy_from_slice(&data[..n]);
        map[..LEN_HEADER].copy_from_slice(&(n as u64).to_le_bytes());
        Ok(n)
    }

    /// A read-only view of the currently published chunk.
    ///
    /// The borrow must not outlive the barrier round it was taken in; the
    /// producer reuses the region as soon as the next round begins.
    pub fn snapshot(&self) -> Result<&[u8], IngestError> {
        let len = self.len()?;
        let map = self.map_ref()?;
        Ok(&map[LEN_HEADER..LEN_HEADER + len])
    }

    /// Detaches the mapping. Idempotent; the name stays registered.
    pub fn close(&mut self) {
        self.map = None;
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// The creating handle of a named fan-out buffer.
///
/// Owns the name's lifetime: dropping the creator (or calling
/// [`FanoutBuffer::unlink`]) removes the name from the system. All data
/// operations go through the embedded [`BufferHandle`].
#[derive(Debug)]
pub struct FanoutBuffer {
    handle: BufferHandle,
    unlinked: bool,
}

impl FanoutBuffer {
    /// Creates a new named region of `capacity` payload bytes.
    ///
    /// # Errors
    /// Returns `IngestError::SharedMemory` when the name already exists or
    /// the region cannot be created and mapped.
    pub fn create(name: &str, capacity: BufferCapacity) -> Result<Self, IngestError> {
        let path = shm_dir().join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                IngestError::SharedMemory(format!("cannot create shared region '{}': {}", name, e))
            })?;
        let total = LEN_HEADER as u64 + capacity.bytes();
        if let Err(e) = file.set_len(total) {
            let _ = fs::remove_file(&path);
            return Err(IngestError::SharedMemory(format!(
                "cannot size shared region '{}' to {} bytes: {}",
                name, total, e
            )));
        }
        let map = match BufferHandle::map_region(&file, name) {
            Ok(map) => map,
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        };
        let mut buffer = FanoutBuffer {
            handle: BufferHandle {
                name: name.to_string(),
                path,
                map: Some(map),
                capacity: capacity.as_usize(),
            },
            unlinked: false,
        };
        // Fresh regions publish an empty chunk.
        buffer.handle.write(&[])?;
        Ok(buffer)
    }

    /// The stable name peers attach by.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Payload capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.handle.capacity()
    }

    /// The currently published payload length.
    pub fn len(&self) -> Result<usize, IngestError> {
        self.handle.len()
    }

    /// Writes a chunk and publishes its length. See [`BufferHandle::write`].
    pub fn write(&mut self, data: &[u8]) -> Result<usize, IngestError> {
        self.handle.write(data)
    }

    /// A read-only view of the current chunk. See [`BufferHandle::snapshot`].
    pub fn snapshot(&self) -> Result<&[u8], IngestError> {
        self.handle.snapshot()
    }

    /// Detaches the creator's own mapping. Idempotent.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Removes the name from the system. Creator-only, once.
    pub fn unlink(&mut self) {
        if !self.unlinked {
            if let Err(e) = fs::remove_file(&self.handle.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(name = %self.handle.name, error = %e, "failed to unlink shared region");
                }
            }
            self.unlinked = true;
        }
    }
}

impl Drop for FanoutBuffer {
    fn drop(&mut self) {
        self.close();
        self.unlink();
    }
}
