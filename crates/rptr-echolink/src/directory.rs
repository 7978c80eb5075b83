// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Echolink directory: the three-index callsign/node-number/IP table
//! (§3, §4.4), and the wire parsing for the directory server's full and
//! differential snapshot format.
//!
//! The snapshot framing (`@@@`/`DDD`/deflate prefix, `<count>` header,
//! per-entry fields) mirrors the length-prefixed framing style in
//! `discovery_server::protocol` — here the "length prefix" is a 3-byte
//! ASCII marker instead of a 4-byte big-endian integer, but the same
//! read-marker-then-parse-body shape applies.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::DirectoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub nodenum: String,
    pub callsign: String,
    pub ip: Ipv4Addr,
}

/// Three synchronized indexes over the same entry set (§3: "all three
/// must reference the same entry set at all times"). Held behind one
/// lock by callers (`directory.lock`, §5).
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    by_nodenum: BTreeMap<String, DirectoryEntry>,
    by_callsign: BTreeMap<String, DirectoryEntry>,
    by_ip: BTreeMap<Ipv4Addr, DirectoryEntry>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_nodenum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nodenum.is_empty()
    }

    pub fn by_nodenum(&self, nodenum: &str) -> Option<&DirectoryEntry> {
        self.by_nodenum.get(nodenum)
    }

    pub fn by_callsign(&self, callsign: &str) -> Option<&DirectoryEntry> {
        self.by_callsign.get(callsign)
    }

    pub fn by_ip(&self, ip: Ipv4Addr) -> Option<&DirectoryEntry> {
        self.by_ip.get(&ip)
    }

    pub fn clear(&mut self) {
        self.by_nodenum.clear();
        self.by_callsign.clear();
        self.by_ip.clear();
    }

    /// Remove an entry by node number from all three indexes atomically.
    pub fn remove(&mut self, nodenum: &str) {
        if let Some(entry) = self.by_nodenum.remove(nodenum) {
            self.by_callsign.remove(&entry.callsign);
            self.by_ip.remove(&entry.ip);
        }
    }

    /// Insert or replace an entry across all three indexes atomically.
    pub fn upsert(&mut self, entry: DirectoryEntry) {
        self.remove(&entry.nodenum);
        self.by_callsign.insert(entry.callsign.clone(), entry.clone());
        self.by_ip.insert(entry.ip, entry.clone());
        self.by_nodenum.insert(entry.nodenum.clone(), entry);
    }

    /// Full download: wipe the directory first, then insert every entry
    /// in `entries` (§4.4 "Full replacements wipe the directory first").
    pub fn apply_full(&mut self, entries: Vec<DirectoryEntry>) {
        self.clear();
        for entry in entries {
            self.upsert(entry);
        }
    }

    /// Differential download: each named entry is deleted then re-added
    /// unless it falls after a `+++` marker, in which case it's a
    /// delete-only entry (§4.4).
    pub fn apply_differential(&mut self, ops: Vec<DifferentialOp>) {
        for op in ops {
            match op {
                DifferentialOp::Upsert(entry) => self.upsert(entry),
                DifferentialOp::Delete(nodenum) => self.remove(&nodenum),
            }
        }
    }
}

/// One line of a differential snapshot, already split on the `+++`
/// delete-only switch (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DifferentialOp {
    Upsert(DirectoryEntry),
    Delete(String),
}

/// Snapshot framing marker (§4.4): the first bytes of a directory
/// download determine whether it's an uncompressed full/differential
/// snapshot or a deflate-compressed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFraming {
    Full,
    Differential,
    Deflated,
}

pub fn detect_framing(bytes: &[u8]) -> Result<SnapshotFraming, DirectoryError> {
    match bytes.get(..3) {
        Some(b"@@@") => Ok(SnapshotFraming::Full),
        Some(b"DDD") => Ok(SnapshotFraming::Differential),
        Some(_) => Ok(SnapshotFraming::Deflated),
        None => Err(DirectoryError::Malformed("snapshot shorter than framing marker".into())),
    }
}

/// Parse the entry-count/snapshot-id header line: `<count>[:<snapshot>]`.
pub fn parse_header(line: &str) -> Result<(usize, Option<String>), DirectoryError> {
    let (count_str, snapshot) = match line.split_once(':') {
        Some((c, s)) => (c, Some(s.to_string())),
        None => (line, None),
    };
    let count = count_str
        .trim()
        .parse::<usize>()
        .map_err(|_| DirectoryError::Malformed(format!("bad entry count {count_str:?}")))?;
    Ok((count, snapshot))
}

/// Parse one `(callsign, location+status, nodenum, IP)` entry group,
/// tab- or comma-delimited per the directory server's line format.
pub fn parse_entry_line(line: &str) -> Result<DirectoryEntry, DirectoryError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(DirectoryError::Malformed(format!("entry line needs 4 fields: {line:?}")));
    }
    let callsign = fields[0].to_string();
    let nodenum = fields[2].to_string();
    let ip: Ipv4Addr = fields[3]
        .parse()
        .map_err(|_| DirectoryError::Malformed(format!("bad IP {:?}", fields[3])))?;
    Ok(DirectoryEntry { nodenum, callsign, ip })
}

/// Parse a full, already-decompressed differential body into ops,
/// honoring the `+++` delete-only switch.
pub fn parse_differential_body(body: &str) -> Result<Vec<DifferentialOp>, DirectoryError> {
    let mut ops = Vec::new();
    let mut delete_only = false;
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "+++" {
            delete_only = true;
            continue;
        }
        if delete_only {
            ops.push(DifferentialOp::Delete(line.to_string()));
        } else {
            let entry = parse_entry_line(line)?;
            ops.push(DifferentialOp::Delete(entry.nodenum.clone()));
            ops.push(DifferentialOp::Upsert(entry));
        }
    }
    Ok(ops)
}

/// Retry/registration cadences (§4.4), in seconds.
pub const RETRY_ON_FAILURE_S: u64 = 20;
pub const RETRY_AFTER_COMPRESSED_SUCCESS_S: u64 = 240;
pub const RETRY_AFTER_UNCOMPRESSED_SUCCESS_S: u64 = 1_800;
pub const REGISTER_ON_SUCCESS_S: u64 = 360;
pub const REGISTER_ON_FAILURE_S: u64 = 20;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nodenum: &str, callsign: &str, ip: [u8; 4]) -> DirectoryEntry {
        DirectoryEntry { nodenum: nodenum.into(), callsign: callsign.into(), ip: Ipv4Addr::from(ip) }
    }

    #[test]
    fn full_download_replaces_entire_set() {
        let mut dir = DirectoryIndex::new();
        dir.apply_full(vec![entry("1", "W1AAA", [10, 0, 0, 1])]);
        dir.apply_full(vec![entry("2", "W1BBB", [10, 0, 0, 2])]);
        assert_eq!(dir.len(), 1);
        assert!(dir.by_nodenum("1").is_none());
        assert_eq!(dir.by_nodenum("2").unwrap().callsign, "W1BBB");
        assert_eq!(dir.by_callsign("W1BBB").unwrap().nodenum, "2");
        assert_eq!(dir.by_ip(Ipv4Addr::new(10, 0, 0, 2)).unwrap().nodenum, "2");
    }

    #[test]
    fn differential_then_plus_plus_plus_then_delete_matches_p5() {
        let mut dir = DirectoryIndex::new();
        dir.apply_full(vec![
            entry("1", "W1AAA", [10, 0, 0, 1]),
            entry("2", "W1BBB", [10, 0, 0, 2]),
        ]);

        let body = "W1AAA,QTH,1,10.0.0.9\n+++\n2\n";
        let ops = parse_differential_body(body).unwrap();
        dir.apply_differential(ops);

        assert_eq!(dir.by_nodenum("1").unwrap().ip, Ipv4Addr::new(10, 0, 0, 9));
        assert!(dir.by_nodenum("2").is_none());
    }

    #[test]
    fn detects_all_three_framing_kinds() {
        assert_eq!(detect_framing(b"@@@1\n").unwrap(), SnapshotFraming::Full);
        assert_eq!(detect_framing(b"DDD1\n").unwrap(), SnapshotFraming::Differential);
        assert_eq!(detect_framing(&[0x78, 0x9c, 0x01]).unwrap(), SnapshotFraming::Deflated);
    }

    #[test]
    fn header_line_carries_optional_snapshot_id() {
        assert_eq!(parse_header("42:abc123").unwrap(), (42, Some("abc123".to_string())));
        assert_eq!(parse_header("42").unwrap(), (42, None));
    }

    #[test]
    fn entry_line_rejects_malformed_ip() {
        assert!(parse_entry_line("W1AAA,QTH,1,not-an-ip").is_err());
    }
}
