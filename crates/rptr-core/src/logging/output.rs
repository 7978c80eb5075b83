// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging output backends (console and file).
//!
//! Thin, thread-safe destinations for the global logger. Mirrors the
//! split used elsewhere in this codebase between a cheap stderr sink for
//! interactive use and a file sink for unattended daemon operation.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

/// Log level enumeration for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warning => "WARN ",
            Self::Error => "ERROR",
        }
    }
}

/// Output destination trait for log messages.
pub trait Output: Send + Sync {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

/// Writes to stderr with a level prefix and newline.
pub struct ConsoleOutput {
    level_filter: LogLevel,
}

impl ConsoleOutput {
    pub fn new(level_filter: LogLevel) -> Self {
        Self { level_filter }
    }
}

impl Output for ConsoleOutput {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        eprintln!("[{}] {}", level.as_str(), message);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Appends log messages to a file, e.g. for unattended node operation.
pub struct FileOutput {
    file: Mutex<std::fs::File>,
    level_filter: LogLevel,
}

impl FileOutput {
    pub fn new(path: &str, level_filter: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            level_filter,
        })
    }
}

impl Output for FileOutput {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file output mutex poisoned"))?;
        writeln!(file, "[{}] {}", level.as_str(), message)
    }

    fn flush(&self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("file output mutex poisoned"))?
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn console_output_filters_below_threshold() {
        let out = ConsoleOutput::new(LogLevel::Warning);
        assert!(out.write(LogLevel::Debug, "suppressed").is_ok());
        assert!(out.write(LogLevel::Error, "shown").is_ok());
    }

    #[test]
    fn file_output_roundtrip() {
        let path = std::env::temp_dir().join("rptr-core-test-log.txt");
        let path_str = path.to_str().unwrap();
        let out = FileOutput::new(path_str, LogLevel::Debug).expect("create file output");
        out.write(LogLevel::Info, "hello").expect("write");
        out.flush().expect("flush");
        let contents = std::fs::read_to_string(&path).expect("read back");
        assert!(contents.contains("hello"));
        let _ = std::fs::remove_file(&path);
    }
}
