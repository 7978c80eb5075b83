// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe logging with swappable output backends.
//!
//! The node controller and link set log via the [`log`] crate macros for
//! day-to-day tracing; this module backs a small subset of call sites
//! (supervisor start/stop, config load failures) that want an explicit,
//! always-on sink independent of whatever `log` backend the embedding
//! application installed.

mod logger;
mod output;

pub use logger::{init_logger, log};
pub use output::{ConsoleOutput, FileOutput, LogLevel, Output};
