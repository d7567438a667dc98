// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hashstore CLI
//!
//! Thin command-line front end over the ingestion engine. Reports are
//! printed as JSON on stdout; diagnostics go to stderr through tracing.
//!
//! ## Commands
//!
//! ```bash
//! # Hash files without storing them (batch, one thread per file)
//! hashstore hash notes.txt archive.tar
//!
//! # Hash one file through the shared-memory fan-out
//! hashstore hash --fanout --magic --mime big.iso
//!
//! # Create the store tree and count existing content
//! hashstore init
//!
//! # Ingest files: hash, admit, commit under the sha256 identifier
//! hashstore ingest incoming/*.bin
//!
//! # Remove by identifier and size, show store health
//! hashstore remove 56bb3d0a2a7f... 123
//! hashstore status
//! ```

use std::path::PathBuf;

use anyhow::Context;
use byte_unit::{Byte, UnitType};
use clap::{Parser, Subcommand};

use hashstore::infrastructure::config::IngestConfig;
use hashstore::infrastructure::logging::init_tracing;
use hashstore::{DirectoryFileStore, FanoutPipeline, FileHasher, HasherConfig, IngestService};

#[derive(Parser)]
#[command(name = "hashstore", version, about = "Content-addressed file ingestion engine")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute file metadata without storing anything.
    Hash {
        /// Files to hash.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Hash labels to compute (defaults from configuration).
        #[arg(long, value_delimiter = ',')]
        hashes: Option<Vec<String>>,
        /// Use the shared-memory fan-out pipeline instead of the batch hasher.
        #[arg(long)]
        fanout: bool,
        /// Include a content description (fan-out only).
        #[arg(long)]
        magic: bool,
        /// Include a MIME type (fan-out only).
        #[arg(long)]
        mime: bool,
    },
    /// Create the store directory tree and count existing files.
    Init,
    /// Hash files and commit them into the store.
    Ingest {
        /// Files to ingest. Sources are consumed on success.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove a stored file by identifier and byte count.
    Remove {
        /// Hex identifier the file was stored under.
        key: String,
        /// Exact byte count of the stored file.
        size: u64,
    },
    /// Show store occupancy and free space.
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => IngestConfig::load(path)
            .with_context(|| format!("loading configuration from '{}'", path.display()))?,
        None => IngestConfig::default(),
    };

    match cli.command {
        Command::Hash {
            files,
            hashes,
            fanout,
            magic,
            mime,
        } => {
            let labels = hashes.unwrap_or_else(|| config.pipeline.hashes.clone());
            if fanout {
                let pipeline = FanoutPipeline::new(config.pipeline.to_options()?)?;
                for file in files {
                    let report = pipeline.hash_file(&file, &labels, magic, mime)?;
                    println!("{}", serde_json::to_string(&report)?);
                }
            } else {
                let algorithms = labels
                    .iter()
                    .filter_map(|label| label.parse().ok())
                    .collect::<Vec<_>>();
                let hasher = FileHasher::new(HasherConfig {
                    algorithms,
                    ..HasherConfig::default()
                })?;
                for (path, result) in hasher.hash_many(&files) {
                    match result {
                        Ok(report) => println!("{}", serde_json::to_string(&report)?),
                        Err(e) => tracing::error!(path = %path.display(), error = %e, "hashing failed"),
                    }
                }
            }
        }
        Command::Init => {
            let store = DirectoryFileStore::new(config.store.to_options())?;
            let (created, found) = store.init_store()?;
            println!("{{\"dirs_created\":{},\"files_found\":{}}}", created, found);
        }
        Command::Ingest { files } => {
            let pipeline = FanoutPipeline::new(config.pipeline.to_options()?)?;
            let store = DirectoryFileStore::new(config.store.to_options())?;
            store.init_store()?;
            let service =
                IngestService::new(pipeline, store, config.pipeline.identifier_algorithm()?);

            for file in files {
                let outcome = service.ingest(
                    &file,
                    &config.pipeline.hashes,
                    config.pipeline.magic,
                    config.pipeline.mime,
                )?;
                println!("{}", serde_json::to_string(&outcome.report)?);
            }
        }
        Command::Remove { key, size } => {
            let store = DirectoryFileStore::new(config.store.to_options())?;
            let removed = store.remove_file(&key, size)?;
            println!("{{\"removed\":{}}}", removed);
        }
        Command::Status => {
            let store = DirectoryFileStore::new(config.store.to_options())?;
            let stored = store.count_stored()?;
            let free = Byte::from_u64(store.get_free_bytes()?)
                .get_appropriate_unit(UnitType::Binary);
            println!(
                "{{\"files_stored\":{},\"free_space\":\"{:.2}\",\"free_percent\":{:.1}}}",
                stored,
                free,
                store.get_free()?
            );
        }
    }

    Ok(())
}
