// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Runtime
//!
//! The runtime owns the buffer pool and runs one ingest's worth of peers:
//! one file-reading producer plus N consumers, each on its own OS thread,
//! sharing nothing but the per-buffer synchronizers. It joins every peer's
//! report, cross-checks the observed byte counts against the producer's,
//! and merges the labels into one [`MetadataReport`].
//!
//! ## Pool Ownership
//!
//! The runtime is the sole creator of its buffers. Peers attach by name and
//! close their own mappings when they exit; the pool itself is unlinked when
//! the runtime is dropped, on the success path and on every abort path
//! alike, because unlinking rides on `Drop`.
//!
//! ## Failure Policy
//!
//! The runtime never cancels peers early: a missing party would leave the
//! barrier under-subscribed and stall everyone else. Instead it waits for
//! every peer to finish (a broken barrier unblocks stalled ones), then
//! raises the most informative error: the first peer fault that is not
//! itself a downstream barrier timeout.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hashstore_domain::{
    BufferCapacity, ChunkConsumer, ConsumerReport, HashAlgorithm, IngestError, MetadataReport,
};

use crate::infrastructure::pipeline::consumers::{drive_consumer, ClassifierConsumer, HashStreamConsumer};
use crate::infrastructure::pipeline::file_reader::FileReader;
use crate::infrastructure::shmem::{BufferSync, FanoutBuffer, RoundBarrier};

/// Failure message for a consumer whose byte count disagrees with the
/// producer's. The exact phrase is part of the runtime's contract.
const SIZE_MISMATCH: &str = "a hash worker did not get expected number of bytes";

/// Tunables for the fan-out runtime.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Number of buffers in the pool. A value below 2 is silently raised:
    /// with a single buffer the producer could never refill while a
    /// consumer still reads, and the pipeline would deadlock.
    pub buffer_count: usize,
    /// Payload capacity of each buffer; also the producer's chunk size.
    pub buffer_capacity: BufferCapacity,
    /// Barrier timeout applied to every wait.
    pub timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            buffer_count: 2,
            buffer_capacity: BufferCapacity::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// The fan-out pipeline runtime: a pool of named shared buffers plus the
/// peer scheduling and report joining for one `hash_file` call at a time.
///
/// The pool is reused across calls; per-call state (barriers, peers) is
/// created fresh each run because the barrier party count depends on the
/// number of consumers requested.
pub struct FanoutPipeline {
    buffers: Vec<FanoutBuffer>,
    timeout: Duration,
}

impl FanoutPipeline {
    /// Allocates the buffer pool.
    ///
    /// # Errors
    /// Returns `IngestError::SharedMemory` when a region cannot be created;
    /// any regions already created are unlinked again on the way out.
    pub fn new(options: PipelineOptions) -> Result<Self, IngestError> {
        let count = options.buffer_count.max(2);
        let run_id = uuid::Uuid::new_v4().simple().to_string();

        let mut buffers = Vec::with_capacity(count);
        for index in 0..count {
            let name = format!("hashstore-{}-{}", run_id, index);
            buffers.push(FanoutBuffer::create(&name, options.buffer_capacity)?);
        }

        tracing::debug!(
            buffers = count,
            capacity = %options.buffer_capacity,
            "fan-out pool allocated"
        );
        Ok(FanoutPipeline {
            buffers,
            timeout: options.timeout,
        })
    }

    /// Names of the pool's shared regions, in rotation order.
    ///
    /// Useful for diagnostics and for verifying teardown: after the
    /// runtime is dropped, attaching to any of these names must fail.
    pub fn buffer_names(&self) -> Vec<String> {
        self.buffers.iter().map(|b| b.name().to_string()).collect()
    }

    /// Computes the requested metadata set for one file.
    ///
    /// `labels` is filtered against the system hash set: unknown labels are
    /// discarded (not an error). One classifier consumer is added when
    /// `want_magic` or `want_mime` is set. With nothing left to consume,
    /// the producer still runs to completion and the report carries only
    /// `size` and `path`.
    pub fn hash_file(
        &self,
        path: &Path,
        labels: &[String],
        want_magic: bool,
        want_mime: bool,
    ) -> Result<MetadataReport, IngestError> {
        let mut consumers: Vec<Box<dyn ChunkConsumer>> = Vec::new();
        if want_magic || want_mime {
            consumers.push(Box::new(ClassifierConsumer::new(want_magic, want_mime)));
        }

        let mut selected = BTreeSet::new();
        for label in labels {
            match label.parse::<HashAlgorithm>() {
                Ok(algorithm) => {
                    selected.insert(algorithm);
                }
                Err(_) => {
                    tracing::debug!(label = %label, "discarding unknown hash label");
                }
            }
        }
        for algorithm in selected {
            consumers.push(Box::new(HashStreamConsumer::new(algorithm)));
        }

        self.run_with_consumers(path, consumers)
    }

    /// Runs the fan-out with an explicit consumer set.
    ///
    /// This is the extension point for future consumer variants: anything
    /// implementing [`ChunkConsumer`] can be plugged in. The built-in
    /// [`hash_file`](Self::hash_file) is a thin wrapper over this.
    pub fn run_with_consumers(
        &self,
        path: &Path,
        mut consumers: Vec<Box<dyn ChunkConsumer>>,
    ) -> Result<MetadataReport, IngestError> {
        let parties = 1 + consumers.len();
        let syncs: Vec<BufferSync> = self
            .buffers
            .iter()
            .map(|buffer| {
                BufferSync::new(
                    buffer.name(),
                    Arc::new(RoundBarrier::new(parties)),
                    self.timeout,
                )
            })
            .collect();

        let reader_path = path.to_path_buf();

        let (reader_result, consumer_results) = std::thread::scope(|scope| {
            let reader_syncs = syncs.clone();
            let reader = scope.spawn(move || FileReader::new(reader_path, reader_syncs).run());

            let mut workers = Vec::with_capacity(consumers.len());
            for consumer in consumers.iter_mut() {
                let name = consumer.name().to_string();
                let peer_syncs = syncs.clone();
                let consumer: &mut dyn ChunkConsumer = consumer.as_mut();
                let handle = scope.spawn(move || drive_consumer(&peer_syncs, consumer));
                workers.push((name, handle));
            }

            let reader_result = reader
                .join()
                .unwrap_or_else(|_| Err(IngestError::WorkerFault("file reader panicked".to_string())));
            let consumer_results: Vec<(String, Result<ConsumerReport, IngestError>)> = workers
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(IngestError::WorkerFault(format!("consumer '{}' panicked", name)))
                    });
                    (name, result)
                })
                .collect();
            (reader_result, consumer_results)
        });

        self.join_reports(reader_result, consumer_results)
    }

    /// Merges peer results, raising the most informative fault.
    fn join_reports(
        &self,
        reader_result: Result<crate::infrastructure::pipeline::file_reader::ReaderReport, IngestError>,
        consumer_results: Vec<(String, Result<ConsumerReport, IngestError>)>,
    ) -> Result<MetadataReport, IngestError> {
        // Prefer a root-cause fault over the barrier timeouts it induced in
        // the other peers.
        let mut errors: Vec<IngestError> = Vec::new();
        if let Err(e) = &reader_result {
            errors.push(e.clone());
        }
        for (_, result) in &consumer_results {
            if let Err(e) = result {
                errors.push(e.clone());
            }
        }
        if !errors.is_empty() {
            let root_cause = errors
                .iter()
                .find(|e| !matches!(e, IngestError::Timeout(_)))
                .unwrap_or(&errors[0]);
            return Err(root_cause.clone());
        }

        let reader_report = reader_result.expect("checked above");
        let mut merged = MetadataReport::new(reader_report.size, reader_report.path);

        for (name, result) in consumer_results {
            let report = result.expect("checked above");
            if report.bytes_seen != merged.size {
                return Err(IngestError::SizeMismatch(format!(
                    "{}: consumer '{}' observed {} of {} bytes",
                    SIZE_MISMATCH, name, report.bytes_seen, merged.size
                )));
            }
            merged.absorb(&report);
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small_options() -> PipelineOptions {
        PipelineOptions {
            buffer_count: 2,
            buffer_capacity: BufferCapacity::new(BufferCapacity::MIN).unwrap(),
            timeout: Duration::from_secs(5),
        }
    }

    fn temp_source(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    /// Tests a size-only run with zero consumers.
    ///
    /// Validates that:
    /// - Requesting no valid labels and no classification still runs the
    ///   producer to completion
    /// - The report carries size and path and nothing else
    #[test]
    fn test_size_only_run() {
        let pipeline = FanoutPipeline::new(small_options()).unwrap();
        let source = temp_source(b"just counting");

        let labels = vec!["blake3".to_string()]; // unknown, silently dropped
        let report = pipeline.hash_file(source.path(), &labels, false, false).unwrap();

        assert_eq!(report.size, 13);
        assert_eq!(report.path(), source.path());
        assert!(report.labels.is_empty());
    }

    /// Tests multi-hash agreement across the fan-out.
    ///
    /// Validates that:
    /// - md5 and sha256 consumers both see the full stream
    /// - Digests match single-shot references
    /// - Duplicate labels collapse to one consumer
    #[test]
    fn test_multi_hash_run() {
        let pipeline = FanoutPipeline::new(small_options()).unwrap();
        // Span several rounds so the pool actually rotates.
        let payload: Vec<u8> = (0..3 * BufferCapacity::MIN + 17).map(|i| (i % 97) as u8).collect();
        let source = temp_source(&payload);

        let labels = vec!["md5".to_string(), "sha256".to_string(), "md5".to_string()];
        let report = pipeline.hash_file(source.path(), &labels, false, false).unwrap();

        assert_eq!(report.size, payload.len() as u64);

        let mut md5 = hashstore_domain::HashFunction::new(HashAlgorithm::Md5);
        md5.update(&payload);
        assert_eq!(report.digest(HashAlgorithm::Md5), Some(md5.finalize_hex().as_str()));

        let mut sha256 = hashstore_domain::HashFunction::new(HashAlgorithm::Sha256);
        sha256.update(&payload);
        assert_eq!(
            report.digest(HashAlgorithm::Sha256),
            Some(sha256.finalize_hex().as_str())
        );
    }

    /// Tests the byte-count cross-check.
    ///
    /// Validates that:
    /// - A consumer reporting one byte short fails the run
    /// - The error carries the contractual mismatch message
    #[test]
    fn test_size_mismatch_detection() {
        struct ShortCounter {
            bytes: u64,
        }

        impl ChunkConsumer for ShortCounter {
            fn name(&self) -> &str {
                "short-counter"
            }
            fn on_start(&mut self) -> Result<(), IngestError> {
                Ok(())
            }
            fn on_chunk(&mut self, payload: &[u8]) -> Result<(), IngestError> {
                self.bytes += payload.len() as u64;
                Ok(())
            }
            fn on_end(&mut self) -> Result<ConsumerReport, IngestError> {
                Ok(ConsumerReport::with_bytes(self.bytes.saturating_sub(1)))
            }
        }

        let pipeline = FanoutPipeline::new(small_options()).unwrap();
        let source = temp_source(b"some payload to count");

        let err = pipeline
            .run_with_consumers(source.path(), vec![Box::new(ShortCounter { bytes: 0 })])
            .unwrap_err();

        match err {
            IngestError::SizeMismatch(message) => {
                assert!(message.contains(SIZE_MISMATCH));
            }
            other => panic!("expected SizeMismatch, got {:?}", other),
        }
    }

    /// Tests pool-size normalization.
    ///
    /// Validates that:
    /// - A requested pool of 1 is raised to 2 and works
    #[test]
    fn test_pool_of_one_is_raised() {
        let pipeline = FanoutPipeline::new(PipelineOptions {
            buffer_count: 1,
            ..small_options()
        })
        .unwrap();
        assert_eq!(pipeline.buffers.len(), 2);

        let source = temp_source(b"pool floor");
        let report = pipeline
            .hash_file(source.path(), &["sha1".to_string()], false, false)
            .unwrap();
        assert_eq!(report.size, 10);
        assert!(report.digest(HashAlgorithm::Sha1).is_some());
    }
}
