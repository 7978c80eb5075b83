// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Peer link data model, text protocol, and link set (component C).

mod connect;
mod proto;
mod set;
mod voter;

pub use connect::{ConnectAttempt, ConnectOutcome, ConnectState, NodeLookup, Resolver};
pub use proto::LinkFrame;
pub use set::{distribute_to_all_links, LinkSet};
pub use voter::{Voter, VoterCandidate};

use crate::timers::Timer;
use std::net::IpAddr;

/// Whether peer audio is repeated, one-way, or kept entirely local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Transceive,
    RxOnly,
    LocalMonitor,
}

/// Phone-style peer behavior, independent of `LinkMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneMode {
    None,
    Phone,
    Dumb,
    Simplex,
    Alt,
}

/// Keying-protocol version a peer speaks (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyingProtocol {
    /// Implicit via CONTROL[KEY]/[UNKEY]; needs redundant re-key.
    Implicit,
    /// `NEWKEY` sent, handshake in progress.
    Redundant,
    /// `NEWKEY1` handshake complete; keys via `K` text frames.
    TextFramed,
}

/// Connection lifecycle state of a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// One peer link (§3 "Link").
#[derive(Debug, Clone)]
pub struct Link {
    pub peer_name: String,
    pub peer_ip: Option<IpAddr>,
    pub mode: LinkMode,
    pub phone_mode: PhoneMode,
    pub keying_protocol: KeyingProtocol,
    pub state: LinkState,

    pub last_rx_real: bool,
    /// VOX-smoothed version of `last_rx_real`.
    pub last_rx: bool,

    pub linger_timer: Timer,
    pub re_tx_timer: Timer,
    pub re_rx_timer: Timer,
    pub new_key_timer: Timer,

    pub connect_time_ms: u64,
    pub elapsed_time_ms: u64,
    pub retries: u32,
    pub max_retries: u32,
    pub reconnects: u32,
    pub disc_time_ms: u32,
    /// Outbound connect/reconnect/backoff state (§4.3); only meaningful
    /// while `outbound` is true.
    pub connect: ConnectAttempt,

    /// True if we originated the connection.
    pub outbound: bool,
    /// Survives across reconnects (Scenario 3: `savednodes` round-trips this).
    pub perma: bool,
    pub voter: bool,

    pub rssi: f32,

    pub text_outbox: Vec<String>,

    /// Three last-frame slots used for DTMF-mute carry-over (§3).
    pub last_frames: [Option<Vec<i16>>; 3],
}

impl Link {
    pub fn new(peer_name: impl Into<String>, mode: LinkMode, outbound: bool) -> Self {
        Self {
            peer_name: peer_name.into(),
            peer_ip: None,
            mode,
            phone_mode: PhoneMode::None,
            keying_protocol: KeyingProtocol::Implicit,
            state: LinkState::Connecting,
            last_rx_real: false,
            last_rx: false,
            linger_timer: Timer::default(),
            re_tx_timer: Timer::default(),
            re_rx_timer: Timer::default(),
            new_key_timer: Timer::default(),
            connect_time_ms: 0,
            elapsed_time_ms: 0,
            retries: 0,
            max_retries: 5,
            reconnects: 0,
            disc_time_ms: 0,
            connect: ConnectAttempt::new(5),
            outbound,
            perma: false,
            voter: false,
            rssi: f32::MIN,
            text_outbox: Vec::new(),
            last_frames: [None, None, None],
        }
    }

    /// Invariant: a v2 peer's voice frames must not pass through while
    /// `last_rx_real` is false (§4.3, the jitter-buffer defense).
    pub fn may_pass_voice(&self) -> bool {
        match self.keying_protocol {
            KeyingProtocol::TextFramed => self.last_rx_real,
            _ => true,
        }
    }

    /// Invariant: no frame generated by this node reaches a
    /// `LocalMonitor` peer.
    pub fn may_send_local_audio(&self) -> bool {
        self.mode != LinkMode::LocalMonitor
    }

    /// Start the v1 handshake timer; called on sending/receiving `NEWKEY`.
    pub fn arm_new_key_timer(&mut self, new_key_time_ms: u32) {
        self.keying_protocol = KeyingProtocol::Redundant;
        self.new_key_timer.start(new_key_time_ms);
    }

    /// Downgrade to v0 with a warning if the handshake never completed
    /// (Design Notes open question: timer preserved, fix belongs in
    /// the transport layer, not here).
    pub fn tick_new_key_timeout(&mut self) -> bool {
        if self.new_key_timer.take_fired() && self.keying_protocol == KeyingProtocol::Redundant {
            log::warn!(
                "link {} NEWKEYTIME expired before handshake completed, downgrading to v0",
                self.peer_name
            );
            self.keying_protocol = KeyingProtocol::Implicit;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_monitor_link_blocks_outbound_audio() {
        let link = Link::new("1002", LinkMode::LocalMonitor, false);
        assert!(!link.may_send_local_audio());
    }

    #[test]
    fn transceive_link_allows_outbound_audio() {
        let link = Link::new("1001", LinkMode::Transceive, true);
        assert!(link.may_send_local_audio());
    }

    #[test]
    fn v2_link_blocks_voice_until_last_rx_real() {
        let mut link = Link::new("1001", LinkMode::Transceive, true);
        link.keying_protocol = KeyingProtocol::TextFramed;
        assert!(!link.may_pass_voice());
        link.last_rx_real = true;
        assert!(link.may_pass_voice());
    }

    #[test]
    fn new_key_timeout_downgrades_protocol() {
        let mut link = Link::new("1001", LinkMode::Transceive, true);
        link.arm_new_key_timer(100);
        link.new_key_timer.advance(150);
        assert!(link.tick_new_key_timeout());
        assert_eq!(link.keying_protocol, KeyingProtocol::Implicit);
    }
}
