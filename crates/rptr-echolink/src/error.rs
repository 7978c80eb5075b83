// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors from the Echolink driver (§7: "Recoverable locally, logged" and
//! "Fatal to an Echolink session").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("packet too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unsupported RTP version {0}")]
    UnsupportedVersion(u8),

    #[error("unrecognized RTCP packet type {0}")]
    UnknownRtcpType(u8),

    #[error("malformed SDES item")]
    MalformedSdes,
}

/// Fatal to one Echolink session (§7), never to the driver itself.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("RTCP keepalive countdown expired")]
    KeepaliveTimeout,

    #[error("BYE received from peer")]
    ByeReceived,

    #[error("channel hung up")]
    ChannelHangup,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed directory snapshot: {0}")]
    Malformed(String),

    #[error("unsupported snapshot framing byte(s): {0:?}")]
    UnknownFraming([u8; 3]),
}
