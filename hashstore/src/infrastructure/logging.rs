// /////////////////////////////////////////////////////////////////////////////
// Hashstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging setup for the binary. Library code emits through
//! `tracing` macros only; this module owns the subscriber so embedders can
//! install their own instead.
//!
//! The filter resolves in order: `RUST_LOG` when set, otherwise the
//! verbosity level passed by the CLI (`-v` for debug, `-vv` for trace,
//! default info).

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Safe to call once per process; a second call is a no-op because the
/// global default can only be set once.
pub fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
