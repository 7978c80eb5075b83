// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DTMF digit buffer and command dispatcher (component E, §4.6).

mod actions;

pub use actions::{dispatch_action, Action, CopSubcommand, DtmfAction, IlinkMode};

use crate::error::DtmfError;
use std::collections::HashMap;
use std::fmt;

/// Every DTMF source named in §4.6, each with its own function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtmfSource {
    Radio,
    Link,
    Phone,
    DumbPhone,
    AltPhone,
    Remote,
    RptInternal,
}

impl fmt::Display for DtmfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Completion codes a handler returns (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtmfCompletion {
    Indeterminate,
    ReqFlush,
    Complete,
    CompleteQuiet,
    DoKey,
    Error,
}

/// A function table entry: `<action>,<param>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub action: Action,
    pub param: String,
}

/// One source's digit-prefix -> action table.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable(HashMap<String, FunctionEntry>);

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, entry: FunctionEntry) {
        self.0.insert(prefix.into(), entry);
    }

    /// Longest-prefix match of `buffer` against the table's keys.
    /// P7: the result depends only on `(table, buffer)`, nothing else.
    fn longest_match(&self, buffer: &str) -> Option<(&str, &FunctionEntry)> {
        self.0
            .iter()
            .filter(|(k, _)| buffer.starts_with(k.as_str()))
            .max_by_key(|(k, _)| k.len())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Whether any key in the table could still extend `buffer` into a
    /// longer match (keeps the dispatcher buffering instead of erroring
    /// out on a prefix that is valid but not yet complete).
    fn has_longer_candidate(&self, buffer: &str) -> bool {
        self.0.keys().any(|k| k.len() > buffer.len() && k.starts_with(buffer))
    }

    /// Build a table from a config-file `functions` map: each value is
    /// `<action-name>,<param>` (e.g. `"cop,5"`, `"ilink,6"`), the same
    /// shorthand app_rpt's `[functions]` stanza uses.
    pub fn from_config_map(map: &HashMap<String, String>) -> Self {
        let mut table = Self::new();
        for (digits, spec) in map {
            let (name, param) = spec.split_once(',').unwrap_or((spec.as_str(), ""));
            if let Some(action) = Action::from_name(name) {
                table.insert(digits.clone(), FunctionEntry { action, param: param.to_string() });
            }
        }
        table
    }
}

const MAXDTMF_DEFAULT: usize = 32;

/// Per-source digit buffer plus the tables to dispatch against.
pub struct DtmfDispatcher {
    tables: HashMap<DtmfSource, FunctionTable>,
    buffer: String,
    max_len: usize,
    pub last_command: Option<String>,
}

impl DtmfDispatcher {
    pub fn new(tables: HashMap<DtmfSource, FunctionTable>) -> Self {
        Self {
            tables,
            buffer: String::new(),
            max_len: MAXDTMF_DEFAULT,
            last_command: None,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Feed one digit from `source`. Returns the completion code and,
    /// when a command matched, the resolved action/param.
    pub fn feed(
        &mut self,
        source: DtmfSource,
        digit: char,
    ) -> Result<(DtmfCompletion, Option<FunctionEntry>), DtmfError> {
        let table = self
            .tables
            .get(&source)
            .ok_or(DtmfError::NoFunctionTable(source))?;

        // Two consecutive function-chars at position 0 resets the buffer
        // (§4.6) rather than being buffered as a two-char prefix.
        if self.buffer.is_empty() && !digit.is_ascii_digit() {
            if let Some(prev) = self.buffer.chars().last() {
                if prev == digit {
                    self.reset();
                    return Ok((DtmfCompletion::ReqFlush, None));
                }
            }
        }

        if self.buffer.len() >= self.max_len {
            return Err(DtmfError::BufferFull(digit));
        }
        self.buffer.push(digit);

        let (matched_prefix, entry) = match table.longest_match(&self.buffer) {
            Some((prefix, entry)) => (Some(prefix.to_string()), Some(entry.clone())),
            None => (None, None),
        };

        if let Some(entry) = entry {
            // Only treat as complete once no longer prefix could still
            // match (an entry "*8" should not fire while "*81" is also
            // a valid, longer key and the buffer could still extend).
            if table.has_longer_candidate(&self.buffer) {
                return Ok((DtmfCompletion::Indeterminate, None));
            }
            self.last_command = matched_prefix;
            self.reset();
            return Ok((DtmfCompletion::Complete, Some(entry)));
        }

        if table.has_longer_candidate(&self.buffer) {
            Ok((DtmfCompletion::Indeterminate, None))
        } else {
            self.reset();
            Ok((DtmfCompletion::Error, None))
        }
    }

    /// Inter-digit timeout elapsed (`dtmf_time + DTMF_TIMEOUT`).
    pub fn on_timeout(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio_table() -> HashMap<DtmfSource, FunctionTable> {
        let mut status = FunctionTable::new();
        status.insert(
            "*81",
            FunctionEntry {
                action: Action::Status,
                param: "1".into(),
            },
        );
        let mut tables = HashMap::new();
        tables.insert(DtmfSource::Radio, status);
        tables
    }

    #[test]
    fn completes_on_exact_match() {
        let mut d = DtmfDispatcher::new(radio_table());
        assert_eq!(d.feed(DtmfSource::Radio, '*').unwrap().0, DtmfCompletion::Indeterminate);
        assert_eq!(d.feed(DtmfSource::Radio, '8').unwrap().0, DtmfCompletion::Indeterminate);
        let (completion, entry) = d.feed(DtmfSource::Radio, '1').unwrap();
        assert_eq!(completion, DtmfCompletion::Complete);
        assert_eq!(entry.unwrap().param, "1");
        assert_eq!(d.buffer(), "");
        assert_eq!(d.last_command.as_deref(), Some("*81"));
    }

    #[test]
    fn unmatched_prefix_errors_and_clears() {
        let mut d = DtmfDispatcher::new(radio_table());
        d.feed(DtmfSource::Radio, '9').unwrap();
        let (completion, _) = d.feed(DtmfSource::Radio, '9').unwrap();
        assert_eq!(completion, DtmfCompletion::Error);
        assert_eq!(d.buffer(), "");
    }

    #[test]
    fn decision_depends_only_on_table_and_buffer() {
        // P7: two dispatchers with identical tables and identical input
        // sequences reach identical states, independent of anything else.
        let mut a = DtmfDispatcher::new(radio_table());
        let mut b = DtmfDispatcher::new(radio_table());
        for d in ['*', '8', '1'] {
            let ra = a.feed(DtmfSource::Radio, d).unwrap();
            let rb = b.feed(DtmfSource::Radio, d).unwrap();
            assert_eq!(ra.0, rb.0);
        }
    }

    #[test]
    fn missing_table_for_source_errors() {
        let mut d = DtmfDispatcher::new(radio_table());
        assert!(matches!(
            d.feed(DtmfSource::Phone, '1'),
            Err(DtmfError::NoFunctionTable(DtmfSource::Phone))
        ));
    }

    #[test]
    fn buffer_full_reports_dropped_digit() {
        let mut d = DtmfDispatcher::new(radio_table());
        d.max_len = 2;
        d.feed(DtmfSource::Radio, '9').unwrap();
        d.feed(DtmfSource::Radio, '9').unwrap();
        assert!(matches!(
            d.feed(DtmfSource::Radio, '9'),
            Err(DtmfError::BufferFull('9'))
        ));
    }
}
