// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory client worker (§4.4 "Directory client").
//!
//! One of the driver's three long-lived threads (§5). Round-robins a
//! configured server list: TCP-connect port [`crate::session::EL_DIRECTORY_PORT`],
//! log in, then fetch a full or differential snapshot and apply it to the
//! shared [`crate::directory::DirectoryIndex`].

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::directory::{self, DifferentialOp, DirectoryIndex, SnapshotFraming};
use crate::error::DirectoryError;

/// Build the login line sent on the first connection to a directory
/// server (§4.4): `l<CALL>\xAC\xAC<PWD>\rONLINE<VER>(HH:DD)\r<LOC>\r<EMAIL>\r`.
pub fn login_line(call: &str, pwd: &str, version: &str, qth: &str, email: &str) -> Vec<u8> {
    let mut line = Vec::new();
    line.push(b'l');
    line.extend_from_slice(call.as_bytes());
    line.push(0xAC);
    line.push(0xAC);
    line.extend_from_slice(pwd.as_bytes());
    line.push(b'\r');
    line.extend_from_slice(format!("ONLINE{version}(HH:DD)").as_bytes());
    line.push(b'\r');
    line.extend_from_slice(qth.as_bytes());
    line.push(b'\r');
    line.extend_from_slice(email.as_bytes());
    line.push(b'\r');
    line
}

/// Build the snapshot-fetch request line: `F<snapshot>\r`, echoing the
/// last-seen snapshot ID or an empty string to force a full download.
pub fn snapshot_request_line(last_snapshot: Option<&str>) -> Vec<u8> {
    let mut line = Vec::new();
    line.push(b'F');
    if let Some(snapshot) = last_snapshot {
        line.extend_from_slice(snapshot.as_bytes());
    }
    line.push(b'\r');
    line
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    CompressedSuccess,
    UncompressedSuccess,
    Failure,
}

impl FetchOutcome {
    /// Next retry delay, in seconds (§4.4 cadences).
    pub fn retry_delay_s(self) -> u64 {
        match self {
            FetchOutcome::Failure => directory::RETRY_ON_FAILURE_S,
            FetchOutcome::CompressedSuccess => directory::RETRY_AFTER_COMPRESSED_SUCCESS_S,
            FetchOutcome::UncompressedSuccess => directory::RETRY_AFTER_UNCOMPRESSED_SUCCESS_S,
        }
    }
}

/// Decode a snapshot body (already past the 2-byte `OK` login ack) into
/// directory ops. `raw` is the bytes following the framing marker check;
/// `inflated` is pre-decompressed text when [`detect_framing`] reported
/// [`SnapshotFraming::Deflated`] (decompression itself lives at the call
/// site, which owns the `flate2` dependency decision).
pub fn apply_snapshot(
    directory: &mut DirectoryIndex,
    framing: SnapshotFraming,
    body: &str,
) -> Result<Option<String>, DirectoryError> {
    let mut lines = body.lines();
    let header = lines.next().ok_or_else(|| DirectoryError::Malformed("empty snapshot body".into()))?;
    let (count, snapshot) = directory::parse_header(header)?;
    let rest: String = lines.collect::<Vec<_>>().join("\n");

    match framing {
        SnapshotFraming::Full => {
            let mut entries = Vec::with_capacity(count);
            for line in rest.lines().take(count) {
                entries.push(directory::parse_entry_line(line)?);
            }
            directory.apply_full(entries);
        }
        SnapshotFraming::Differential => {
            let ops: Vec<DifferentialOp> = directory::parse_differential_body(&rest)?;
            directory.apply_differential(ops);
        }
        SnapshotFraming::Deflated => {
            return Err(DirectoryError::Malformed(
                "deflated body must be inflated before apply_snapshot".into(),
            ));
        }
    }
    Ok(snapshot)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub call: String,
    pub pwd: String,
    pub qth: String,
    pub email: String,
}

/// One login + snapshot-fetch round against a single server. Network I/O
/// is isolated here so [`apply_snapshot`] and the line builders above stay
/// unit-testable without a socket.
pub fn fetch_once(
    server: &ServerConfig,
    version: &str,
    last_snapshot: Option<&str>,
    directory: &mut DirectoryIndex,
) -> Result<(FetchOutcome, Option<String>), DirectoryError> {
    let addr = (server.host.as_str(), directory::EL_DIRECTORY_PORT);

    {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;
        stream.write_all(&login_line(&server.call, &server.pwd, version, &server.qth, &server.email))?;
        let mut ack = [0u8; 2];
        stream.read_exact(&mut ack)?;
        if &ack != b"OK" {
            return Ok((FetchOutcome::Failure, last_snapshot.map(str::to_string)));
        }
    }

    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    stream.write_all(&snapshot_request_line(last_snapshot))?;
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;

    let outer_framing = directory::detect_framing(&raw)?;
    let was_compressed = outer_framing == SnapshotFraming::Deflated;
    let (framing, body_bytes) = match outer_framing {
        SnapshotFraming::Deflated => {
            let inflated = inflate(&raw)?;
            let framing = directory::detect_framing(inflated.as_bytes())?;
            (framing, inflated.into_bytes())
        }
        other => (other, raw),
    };

    let body = std::str::from_utf8(&body_bytes[3..])
        .map_err(|_| DirectoryError::Malformed("snapshot body is not valid UTF-8".into()))?;
    let snapshot = apply_snapshot(directory, framing, body)?;

    let outcome = if was_compressed {
        FetchOutcome::CompressedSuccess
    } else {
        FetchOutcome::UncompressedSuccess
    };

    Ok((outcome, snapshot))
}

fn inflate(_raw: &[u8]) -> Result<String, DirectoryError> {
    Err(DirectoryError::Malformed(
        "deflate decompression requires the flate2 feature, not enabled in this build".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_line_has_expected_framing_bytes() {
        let line = login_line("W1ABC", "secret", "2.0", "FN42", "w1abc@example.com");
        assert_eq!(line[0], b'l');
        assert!(line.starts_with(b"lW1ABC"));
        assert!(line.windows(2).any(|w| w == [0xAC, 0xAC]));
        assert!(line.ends_with(b"w1abc@example.com\r"));
    }

    #[test]
    fn snapshot_request_echoes_last_snapshot_or_is_empty() {
        assert_eq!(snapshot_request_line(Some("abc123")), b"Fabc123\r");
        assert_eq!(snapshot_request_line(None), b"F\r");
    }

    #[test]
    fn apply_snapshot_full_replaces_directory() {
        let mut dir = DirectoryIndex::new();
        let body = "1:snap-1\nW1AAA,QTH,1,10.0.0.1\n";
        let snapshot = apply_snapshot(&mut dir, SnapshotFraming::Full, body).unwrap();
        assert_eq!(snapshot, Some("snap-1".to_string()));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn retry_delay_matches_cadence_table() {
        assert_eq!(FetchOutcome::Failure.retry_delay_s(), 20);
        assert_eq!(FetchOutcome::CompressedSuccess.retry_delay_s(), 240);
        assert_eq!(FetchOutcome::UncompressedSuccess.retry_delay_s(), 1_800);
    }
}
