// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the node controller and its subsystems.
//!
//! Split along the lines §7 of the design draws: fatal-to-worker,
//! fatal-to-link, and recoverable-but-logged. Callers decide what to do
//! with a `NodeError`; the controller loop itself only ever tears down
//! on the `Fatal` variants.

use thiserror::Error;

/// Errors that can terminate a node controller's loop.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("required channel `{0}` hung up")]
    ChannelHangup(&'static str),

    #[error("failed to allocate channel `{0}`: {1}")]
    ChannelAlloc(&'static str, String),

    #[error("serial control port `{0}` configured but could not be opened")]
    SerialUnopenable(String),

    #[error("shutdown requested")]
    Shutdown,
}

/// Errors scoped to a single [`crate::link::Link`].
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("peer `{0}` is already connected")]
    AlreadyConnected(String),

    #[error("no such link `{0}`")]
    NotFound(String),

    #[error("malformed text frame: {0}")]
    MalformedFrame(String),

    #[error("max retries ({0}) exceeded")]
    MaxRetriesExceeded(u32),

    #[error("node name lookup failed for `{0}`")]
    LookupFailed(String),
}

/// Errors from the DTMF dispatcher (buffer overflow, bad table).
#[derive(Debug, Error)]
pub enum DtmfError {
    #[error("dtmf buffer full, dropping digit `{0}`")]
    BufferFull(char),

    #[error("no function table configured for source {0:?}")]
    NoFunctionTable(crate::dtmf::DtmfSource),
}

/// Errors from config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
