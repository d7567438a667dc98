// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-Reading Producer
//!
//! The producer side of the fan-out protocol. The reader owns the only file
//! handle in the pipeline: it reads the source in buffer-sized chunks,
//! publishes each chunk into the next buffer of the pool (round-robin), and
//! trips that buffer's barrier to release the consumers. A zero-length
//! chunk is the terminal signal; it is published through the same path as
//! data chunks, so consumers need no side channel to learn the stream
//! ended.
//!
//! ## Failure Protocol
//!
//! On a source I/O error the reader still attempts to publish a zero-length
//! terminal chunk and trip the current barrier so consumers can drain and
//! exit; if even that fails, the consumers' own barrier timeouts catch the
//! deadlock. A short write into a buffer (the payload did not fit) is a
//! fatal pipeline error: capacity is sized to the read chunk, so a
//! truncated write means the pool is misconfigured.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use hashstore_domain::IngestError;

use crate::infrastructure::shmem::{BufferHandle, BufferSync};

/// The producer's authoritative report: total bytes published and the
/// source path they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderReport {
    pub size: u64,
    pub path: PathBuf,
}

/// The file-reading producer peer.
///
/// Holds the ordered synchronizer set for the buffer pool; attaches to the
/// buffers by name when run. The synchronizer order *is* the rotation
/// order; every peer must iterate the same sequence.
pub struct FileReader {
    path: PathBuf,
    syncs: Vec<BufferSync>,
}

impl FileReader {
    /// Creates a reader for `path` over the pool described by `syncs`.
    pub fn new(path: impl Into<PathBuf>, syncs: Vec<BufferSync>) -> Self {
        FileReader {
            path: path.into(),
            syncs,
        }
    }

    /// Runs the producer protocol to completion.
    ///
    /// # Errors
    /// Fails on source I/O errors, on barrier timeouts, and on truncated
    /// buffer writes. Whatever the failure, the reader first tries to
    /// publish a terminal chunk so consumers do not hang.
    pub fn run(self) -> Result<ReaderReport, IngestError> {
        if self.syncs.is_empty() {
            return Err(IngestError::invalid_config("reader needs at least one buffer synchronizer"));
        }

        let mut file = File::open(&self.path).map_err(|e| {
            IngestError::InvalidFile(format!("cannot open source '{}': {}", self.path.display(), e))
        })?;

        let mut handles = Vec::with_capacity(self.syncs.len());
        for sync in &self.syncs {
            handles.push(sync.attach()?);
        }

        let capacity = handles[0].capacity();
        let mut scratch = vec![0u8; capacity];
        let mut total: u64 = 0;
        let mut round: usize = 0;

        loop {
            let idx = round % handles.len();

            let n = match read_chunk(&mut file, &mut scratch) {
                Ok(n) => n,
                Err(e) => {
                    self.publish_terminal(&mut handles[idx], idx);
                    return Err(IngestError::Io(format!(
                        "read failed on '{}': {}",
                        self.path.display(),
                        e
                    )));
                }
            };

            let written = match handles[idx].write(&scratch[..n]) {
                Ok(written) => written,
                Err(e) => {
                    self.publish_terminal(&mut handles[idx], idx);
                    return Err(e);
                }
            };
            if written != n {
                self.publish_terminal(&mut handles[idx], idx);
                return Err(IngestError::SharedMemory(format!(
                    "short write into buffer '{}': {} of {} bytes",
                    handles[idx].name(),
                    written,
                    n
                )));
            }

            self.syncs[idx].wait(None)?;

            if n == 0 {
                // Terminal chunk published and observed; the stream is done.
                break;
            }
            total += n as u64;
            round += 1;
        }

        tracing::debug!(path = %self.path.display(), size = total, rounds = round, "reader finished");
        Ok(ReaderReport {
            size: total,
            path: self.path,
        })
    }

    /// Best-effort terminal chunk on the abort path: publish a zero-length
    /// payload and trip the barrier once so consumers can drain.
    fn publish_terminal(&self, handle: &mut BufferHandle, idx: usize) {
        let _ = handle.write(&[]);
        let _ = self.syncs[idx].wait(None);
    }
}

/// Reads one chunk, retrying interrupted reads.
fn read_chunk(file: &mut File, scratch: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match file.read(scratch) {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
