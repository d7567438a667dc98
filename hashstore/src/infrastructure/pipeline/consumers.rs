// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Consumers
//!
//! The consumer side of the fan-out protocol: the driver that runs any
//! [`ChunkConsumer`] against the buffer pool, plus the two built-in
//! consumer variants: per-algorithm hashing and libmagic content
//! classification.
//!
//! ## Mirror Protocol
//!
//! A consumer peer mirrors the producer exactly: trip the barrier, snapshot
//! the published chunk, process it, advance to the next buffer. A
//! zero-length snapshot is the terminal chunk; the consumer produces its
//! report and exits. Every consumer must trip every barrier, including for
//! chunks it has no interest in (the classifier after its first chunk),
//! because the barrier is what lets the producer reuse the buffer.

use hashstore_domain::services::metadata_report::{MAGIC_LABEL, MIME_LABEL};
use hashstore_domain::{ChunkConsumer, ConsumerReport, HashAlgorithm, HashFunction, IngestError};

use crate::infrastructure::shmem::BufferSync;

/// Runs one consumer against the pool described by `syncs`.
///
/// This is the only place consumer-side barrier discipline lives;
/// [`ChunkConsumer`] implementations stay synchronization-free.
pub fn drive_consumer(
    syncs: &[BufferSync],
    consumer: &mut dyn ChunkConsumer,
) -> Result<ConsumerReport, IngestError> {
    if syncs.is_empty() {
        return Err(IngestError::invalid_config(
            "consumer needs at least one buffer synchronizer",
        ));
    }

    let mut handles = Vec::with_capacity(syncs.len());
    for sync in syncs {
        handles.push(sync.attach()?);
    }

    consumer.on_start()?;

    let mut round = 0usize;
    loop {
        let idx = round % handles.len();
        syncs[idx].wait(None)?;

        let payload = handles[idx].snapshot()?;
        if payload.is_empty() {
            break;
        }
        consumer.on_chunk(payload)?;
        round += 1;
    }

    let report = consumer.on_end()?;
    tracing::debug!(
        consumer = consumer.name(),
        bytes = report.bytes_seen,
        rounds = round,
        "consumer finished"
    );
    Ok(report)
}

/// A consumer that feeds every chunk into one digest algorithm.
pub struct HashStreamConsumer {
    algorithm: HashAlgorithm,
    hasher: Option<HashFunction>,
    bytes_seen: u64,
}

impl HashStreamConsumer {
    /// Creates a hash consumer for `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        HashStreamConsumer {
            algorithm,
            hasher: None,
            bytes_seen: 0,
        }
    }
}

impl ChunkConsumer for HashStreamConsumer {
    fn name(&self) -> &str {
        self.algorithm.label()
    }

    fn on_start(&mut self) -> Result<(), IngestError> {
        self.hasher = Some(HashFunction::new(self.algorithm));
        self.bytes_seen = 0;
        Ok(())
    }

    fn on_chunk(&mut self, payload: &[u8]) -> Result<(), IngestError> {
        let hasher = self
            .hasher
            .as_mut()
            .ok_or_else(|| IngestError::internal_error("hash consumer was not started"))?;
        hasher.update(payload);
        self.bytes_seen += payload.len() as u64;
        Ok(())
    }

    fn on_end(&mut self) -> Result<ConsumerReport, IngestError> {
        let hasher = self
            .hasher
            .take()
            .ok_or_else(|| IngestError::internal_error("hash consumer was not started"))?;
        Ok(ConsumerReport::with_bytes(self.bytes_seen)
            .label(self.algorithm.label(), hasher.finalize_hex()))
    }
}

/// A consumer that classifies the file from its first chunk.
///
/// Computes a human-readable description (`magic`) and/or a MIME type
/// (`mime`) from the first non-terminal chunk; later chunks are counted but
/// otherwise ignored. libmagic only ever inspects a bounded prefix, so the
/// first chunk is as good as the whole file.
pub struct ClassifierConsumer {
    want_magic: bool,
    want_mime: bool,
    description: Option<String>,
    mime_type: Option<String>,
    classified: bool,
    bytes_seen: u64,
}

impl ClassifierConsumer {
    /// Creates a classifier; at least one of `magic`/`mime` should be set,
    /// otherwise the consumer only contributes a byte count.
    pub fn new(want_magic: bool, want_mime: bool) -> Self {
        ClassifierConsumer {
            want_magic,
            want_mime,
            description: None,
            mime_type: None,
            classified: false,
            bytes_seen: 0,
        }
    }

    fn classify(&mut self, payload: &[u8]) -> Result<(), IngestError> {
        if self.want_magic {
            self.description = Some(classify_buffer(payload, magic::cookie::Flags::ERROR)?);
        }
        if self.want_mime {
            self.mime_type = Some(classify_buffer(
                payload,
                magic::cookie::Flags::ERROR | magic::cookie::Flags::MIME_TYPE,
            )?);
        }
        self.classified = true;
        Ok(())
    }
}

/// One libmagic lookup over an in-memory buffer.
///
/// The cookie is opened per call and never stored: libmagic handles are
/// not shareable between threads, and classification happens once per file.
fn classify_buffer(payload: &[u8], flags: magic::cookie::Flags) -> Result<String, IngestError> {
    let cookie = magic::Cookie::open(flags)
        .map_err(|e| IngestError::ProcessingFailed(format!("cannot open libmagic cookie: {}", e)))?;
    let cookie = cookie
        .load(&Default::default())
        .map_err(|e| IngestError::ProcessingFailed(format!("cannot load libmagic database: {}", e)))?;
    cookie
        .buffer(payload)
        .map_err(|e| IngestError::ProcessingFailed(format!("libmagic classification failed: {}", e)))
}

impl ChunkConsumer for ClassifierConsumer {
    fn name(&self) -> &str {
        "classifier"
    }

    fn on_start(&mut self) -> Result<(), IngestError> {
        self.description = None;
        self.mime_type = None;
        self.classified = false;
        self.bytes_seen = 0;
        Ok(())
    }

    fn on_chunk(&mut self, payload: &[u8]) -> Result<(), IngestError> {
        if !self.classified {
            self.classify(payload)?;
        }
        self.bytes_seen += payload.len() as u64;
        Ok(())
    }

    fn on_end(&mut self) -> Result<ConsumerReport, IngestError> {
        let mut report = ConsumerReport::with_bytes(self.bytes_seen);
        if let Some(description) = self.description.take() {
            report = report.label(MAGIC_LABEL, description);
        }
        if let Some(mime_type) = self.mime_type.take() {
            report = report.label(MIME_LABEL, mime_type);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests the hash consumer against a known vector.
    ///
    /// Validates that:
    /// - The digest matches the single-shot reference
    /// - The byte count covers every chunk
    /// - The label key is the algorithm label
    #[test]
    fn test_hash_consumer_digest() {
        let mut consumer = HashStreamConsumer::new(HashAlgorithm::Sha256);
        consumer.on_start().unwrap();
        consumer.on_chunk(b"ab").unwrap();
        consumer.on_chunk(b"c").unwrap();
        let report = consumer.on_end().unwrap();

        assert_eq!(report.bytes_seen, 3);
        assert_eq!(
            report.labels.get("sha256").map(String::as_str),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    /// Tests that an unstarted hash consumer refuses chunks.
    ///
    /// Validates that:
    /// - on_chunk before on_start is an internal error
    #[test]
    fn test_hash_consumer_requires_start() {
        let mut consumer = HashStreamConsumer::new(HashAlgorithm::Md5);
        assert!(matches!(
            consumer.on_chunk(b"data"),
            Err(IngestError::Internal(_))
        ));
    }

    /// Tests first-chunk-only classification.
    ///
    /// Validates that:
    /// - The classifier inspects the first chunk and ignores later ones
    /// - The byte count still covers every chunk
    /// - magic/mime labels are present when requested
    #[test]
    fn test_classifier_first_chunk_only() {
        let mut consumer = ClassifierConsumer::new(true, true);
        consumer.on_start().unwrap();
        // A PNG signature in the first chunk...
        consumer.on_chunk(b"\x89PNG\r\n\x1a\n____________").unwrap();
        // ...followed by bytes that would classify differently on their own.
        consumer.on_chunk(b"%PDF-1.4 not inspected").unwrap();
        let report = consumer.on_end().unwrap();

        assert_eq!(report.bytes_seen, 20 + 22);
        let magic = report.labels.get(MAGIC_LABEL).expect("magic label");
        assert!(magic.to_lowercase().contains("png"), "got '{}'", magic);
        let mime = report.labels.get(MIME_LABEL).expect("mime label");
        assert_eq!(mime, "image/png");
    }

    /// Tests the classifier on a stream with no chunks.
    ///
    /// Validates that:
    /// - A terminal-only stream yields a report with zero bytes and no
    ///   classification labels
    #[test]
    fn test_classifier_empty_stream() {
        let mut consumer = ClassifierConsumer::new(true, true);
        consumer.on_start().unwrap();
        let report = consumer.on_end().unwrap();

        assert_eq!(report.bytes_seen, 0);
        assert!(report.labels.is_empty());
    }
}
