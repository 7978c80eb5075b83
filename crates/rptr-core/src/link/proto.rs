// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The link text mini-protocol (§4.3).
//!
//! Space-separated ASCII, first word selects the frame type. This is
//! deliberately not `serde`-derived — it's a wire format with positional
//! fields and free-text tails (`M`, `T`), not a structured document.

use crate::error::LinkError;
use std::fmt;
use std::str::FromStr;

/// A parsed link text frame, per the §4.3 table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFrame {
    Disc,
    NewKey,
    NewKey1,
    IaxKey,
    /// Peer's connected-links list, stored verbatim.
    Links(String),
    /// `M <src> <dst> <text...>`
    Message { src: String, dst: String, text: String },
    /// `T <src> <dest-cmd>`
    TelemetryVar { src: String, dest_cmd: String },
    /// `C <src> <group> <tone>`
    Ctcss { src: String, group: String, tone: String },
    /// `K <dest> <src> <seq> <ts>`, or `K?` as a query on `dest`.
    Keying {
        dest: String,
        src: String,
        seq: u32,
        ts: u64,
        query: bool,
    },
    /// `I <src> <dest>`
    Mdc1200Id { src: String, dest: String },
    /// `D <dest> <src> <seq> <digit>`
    Dtmf { dest: String, src: String, seq: u32, digit: char },
}

impl FromStr for LinkFrame {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, ' ');
        let first = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match first {
            "DISC" => Ok(LinkFrame::Disc),
            "NEWKEY" => Ok(LinkFrame::NewKey),
            "NEWKEY1" => Ok(LinkFrame::NewKey1),
            "IAXKEY" => Ok(LinkFrame::IaxKey),
            "L" => Ok(LinkFrame::Links(rest.to_string())),
            "M" => {
                let mut f = rest.splitn(3, ' ');
                let src = f.next().ok_or_else(|| malformed(s))?.to_string();
                let dst = f.next().ok_or_else(|| malformed(s))?.to_string();
                let text = f.next().unwrap_or("").to_string();
                Ok(LinkFrame::Message { src, dst, text })
            }
            "T" => {
                let mut f = rest.splitn(2, ' ');
                let src = f.next().ok_or_else(|| malformed(s))?.to_string();
                let dest_cmd = f.next().unwrap_or("").to_string();
                Ok(LinkFrame::TelemetryVar { src, dest_cmd })
            }
            "C" => {
                let mut f = rest.split(' ');
                let src = f.next().ok_or_else(|| malformed(s))?.to_string();
                let group = f.next().ok_or_else(|| malformed(s))?.to_string();
                let tone = f.next().ok_or_else(|| malformed(s))?.to_string();
                Ok(LinkFrame::Ctcss { src, group, tone })
            }
            "K" => {
                let mut f = rest.split(' ');
                let dest = f.next().ok_or_else(|| malformed(s))?.to_string();
                let src_tok = f.next().ok_or_else(|| malformed(s))?;
                let query = src_tok == "K?";
                let src = src_tok.trim_end_matches('?').to_string();
                let seq = f.next().unwrap_or("0").parse().unwrap_or(0);
                let ts = f.next().unwrap_or("0").parse().unwrap_or(0);
                Ok(LinkFrame::Keying {
                    dest,
                    src,
                    seq,
                    ts,
                    query,
                })
            }
            "I" => {
                let mut f = rest.split(' ');
                let src = f.next().ok_or_else(|| malformed(s))?.to_string();
                let dest = f.next().ok_or_else(|| malformed(s))?.to_string();
                Ok(LinkFrame::Mdc1200Id { src, dest })
            }
            "D" => {
                let mut f = rest.split(' ');
                let dest = f.next().ok_or_else(|| malformed(s))?.to_string();
                let src = f.next().ok_or_else(|| malformed(s))?.to_string();
                let seq = f.next().ok_or_else(|| malformed(s))?.parse().unwrap_or(0);
                let digit = f
                    .next()
                    .and_then(|d| d.chars().next())
                    .ok_or_else(|| malformed(s))?;
                Ok(LinkFrame::Dtmf { dest, src, seq, digit })
            }
            _ => Err(malformed(s)),
        }
    }
}

fn malformed(s: &str) -> LinkError {
    LinkError::MalformedFrame(s.to_string())
}

impl fmt::Display for LinkFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFrame::Disc => write!(f, "DISC"),
            LinkFrame::NewKey => write!(f, "NEWKEY"),
            LinkFrame::NewKey1 => write!(f, "NEWKEY1"),
            LinkFrame::IaxKey => write!(f, "IAXKEY"),
            LinkFrame::Links(list) => write!(f, "L {list}"),
            LinkFrame::Message { src, dst, text } => write!(f, "M {src} {dst} {text}"),
            LinkFrame::TelemetryVar { src, dest_cmd } => write!(f, "T {src} {dest_cmd}"),
            LinkFrame::Ctcss { src, group, tone } => write!(f, "C {src} {group} {tone}"),
            LinkFrame::Keying {
                dest,
                src,
                seq,
                ts,
                query,
            } => {
                if *query {
                    write!(f, "K {dest} {src}?")
                } else {
                    write!(f, "K {dest} {src} {seq} {ts}")
                }
            }
            LinkFrame::Mdc1200Id { src, dest } => write!(f, "I {src} {dest}"),
            LinkFrame::Dtmf { dest, src, seq, digit } => {
                write!(f, "D {dest} {src} {seq} {digit}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_disc() {
        assert_eq!("DISC".parse::<LinkFrame>().unwrap(), LinkFrame::Disc);
    }

    #[test]
    fn parses_message() {
        let f: LinkFrame = "M 546 0 hello world".parse().unwrap();
        assert_eq!(
            f,
            LinkFrame::Message {
                src: "546".into(),
                dst: "0".into(),
                text: "hello world".into()
            }
        );
    }

    #[test]
    fn parses_dtmf_frame() {
        let f: LinkFrame = "D 0 546 7 5".parse().unwrap();
        assert_eq!(
            f,
            LinkFrame::Dtmf {
                dest: "0".into(),
                src: "546".into(),
                seq: 7,
                digit: '5'
            }
        );
    }

    #[test]
    fn parses_keying_query() {
        let f: LinkFrame = "K 0 546?".parse().unwrap();
        assert_eq!(
            f,
            LinkFrame::Keying {
                dest: "0".into(),
                src: "546".into(),
                seq: 0,
                ts: 0,
                query: true
            }
        );
    }

    #[test]
    fn roundtrips_through_display_and_parse() {
        let original = LinkFrame::Ctcss {
            src: "546".into(),
            group: "1".into(),
            tone: "100.0".into(),
        };
        let rendered = original.to_string();
        let reparsed: LinkFrame = rendered.parse().unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn unknown_first_word_is_malformed() {
        assert!("ZZZ foo".parse::<LinkFrame>().is_err());
    }

    #[test]
    fn short_dtmf_frame_is_malformed() {
        assert!("D 0 546".parse::<LinkFrame>().is_err());
    }
}
