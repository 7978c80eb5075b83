// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `EcholinkSession` data model and lifecycle (§3, §4.4).
//!
//! Like [`rptr_core::timers::Timers`], every time-dependent method here
//! takes the elapsed milliseconds explicitly rather than reading the wall
//! clock, so the driver's worker thread owns the one call to
//! `Instant::now()` and everything below it stays unit-testable.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use rptr_core::channel::{ControlCode, Frame, PeerChannel};

use crate::jitter::JitterTracker;

/// Reinterpret raw GSM-frame bytes as a placeholder PCM stream: a real
/// GSM 06.10 codec is out of scope (Non-goals), so the bytes are just
/// paired up as little-endian `i16`s. Non-perceptual, plumbing only.
pub fn placeholder_decode(bytes: &[u8]) -> Vec<i16> {
    bytes.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect()
}

/// Inverse of [`placeholder_decode`].
pub fn placeholder_encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Echolink node numbers live in AllStar identity space prefixed with `3`.
pub fn caller_id_for_node(nodenum: &str) -> String {
    format!("3{nodenum}")
}

/// BYE burst interval while a peer sits in the pending (unauthorized) table.
pub const AUTH_RETRY_MS: u64 = 5_000;
/// A pending peer that never re-sends within this window is forgotten.
pub const AUTH_ABANDONED_MS: u64 = 15_000;
/// Pending-table capacity (§4.4).
pub const MAX_PENDING: usize = 20;
/// Default RTCP countdown, in heartbeat ticks (~1 Hz).
pub const DEFAULT_RTCPTIMEOUT: i32 = 15;
pub const EL_DIRECTORY_PORT: u16 = 5200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Outbound dial in progress, waiting for the peer's SDES.
    Ringing,
    Connected,
}

/// Why an inbound SDES from an unknown IP was or wasn't let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    Admit,
    UnknownPeer,
    Denied,
    NotPermitted,
}

/// Deny/permit-list check (§4.4): deny is a glob pattern list, permit (if
/// non-empty) is an allow-list. `known` reports whether the peer IP
/// resolved in the directory.
pub fn admit(known: bool, callsign: &str, deny: &[String], permit: &[String]) -> AdmitDecision {
    if !known {
        return AdmitDecision::UnknownPeer;
    }
    if deny.iter().any(|pat| glob_match(pat, callsign)) {
        return AdmitDecision::Denied;
    }
    if !permit.is_empty() && !permit.iter().any(|pat| glob_match(pat, callsign)) {
        return AdmitDecision::NotPermitted;
    }
    AdmitDecision::Admit
}

fn glob_match(pattern: &str, text: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern.eq_ignore_ascii_case(text),
        Some((prefix, suffix)) => {
            text.len() >= prefix.len() + suffix.len()
                && text[..prefix.len()].eq_ignore_ascii_case(prefix)
                && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
        }
    }
}

/// An unauthorized peer awaiting either silence (→ dropped) or directory
/// admission (→ promoted to a session).
#[derive(Debug, Clone)]
pub struct PendingPeer {
    pub ip: Ipv4Addr,
    pub callsign: String,
    first_seen_ms: u64,
    last_bye_burst_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Vec<PendingPeer>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.entries.iter().any(|p| p.ip == ip)
    }

    /// Add `ip`/`callsign` to the table. Silently drops the request if the
    /// table is at capacity (§4.4: bounded 20-entry table).
    pub fn insert(&mut self, ip: Ipv4Addr, callsign: String, now_ms: u64) {
        if self.entries.iter().any(|p| p.ip == ip) || self.entries.len() >= MAX_PENDING {
            return;
        }
        self.entries.push(PendingPeer {
            ip,
            callsign,
            first_seen_ms: now_ms,
            last_bye_burst_ms: None,
        });
    }

    /// Drop any entry that's been silent beyond `AUTH_ABANDONED_MS`, and
    /// return the IPs due a fresh BYE burst (due at `AUTH_RETRY_MS`
    /// cadence since admission or the last burst).
    pub fn tick(&mut self, now_ms: u64) -> Vec<Ipv4Addr> {
        self.entries
            .retain(|p| now_ms.saturating_sub(p.first_seen_ms) < AUTH_ABANDONED_MS);
        let mut due = Vec::new();
        for entry in &mut self.entries {
            let since = now_ms.saturating_sub(entry.last_bye_burst_ms.unwrap_or(entry.first_seen_ms));
            if entry.last_bye_burst_ms.is_none() || since >= AUTH_RETRY_MS {
                entry.last_bye_burst_ms = Some(now_ms);
                due.push(entry.ip);
            }
        }
        due
    }
}

#[derive(Debug)]
pub struct EcholinkSession {
    pub peer_ip: Ipv4Addr,
    pub peer_port: u16,
    pub peer_callsign: String,
    pub peer_name: String,
    pub local_cid: String,
    pub state: SessionState,

    pub in_sequence: u16,
    pub out_sequence: u16,
    pub jitter: JitterTracker,

    pub rx_audio_packets: u64,
    pub tx_audio_packets: u64,
    pub rx_control_packets: u64,
    pub tx_control_packets: u64,
    pub rx_bad_packets: u64,

    /// Decremented once per heartbeat tick; reaching zero is fatal (§7).
    pub countdown: i32,
    pub timed_out: bool,
    pub doubling: bool,

    /// One GSM-encoded outbound audio block awaiting flush into an RTP
    /// packet of [`crate::rtp::GSM_FRAMES_PER_PACKET`] frames.
    outbound_gsm: Vec<u8>,
    outbox: Vec<Frame>,
    hung_up: bool,
}

impl EcholinkSession {
    pub fn new_inbound(peer_ip: Ipv4Addr, peer_port: u16, peer_callsign: String, local_cid: String) -> Self {
        Self {
            peer_ip,
            peer_port,
            peer_callsign,
            peer_name: String::new(),
            local_cid,
            state: SessionState::Connected,
            in_sequence: 0,
            out_sequence: 0,
            jitter: JitterTracker::new(),
            rx_audio_packets: 0,
            tx_audio_packets: 0,
            rx_control_packets: 0,
            tx_control_packets: 0,
            rx_bad_packets: 0,
            countdown: DEFAULT_RTCPTIMEOUT,
            timed_out: false,
            doubling: false,
            outbound_gsm: Vec::new(),
            outbox: Vec::new(),
            hung_up: false,
        }
    }

    pub fn new_outbound(peer_ip: Ipv4Addr, peer_port: u16, peer_callsign: String, local_cid: String) -> Self {
        let mut session = Self::new_inbound(peer_ip, peer_port, peer_callsign, local_cid);
        session.state = SessionState::Ringing;
        session
    }

    /// One heartbeat decrement (~1 Hz, §4.4). Returns `true` once the
    /// countdown reaches zero, which is fatal to the session.
    pub fn heartbeat(&mut self) -> bool {
        self.countdown -= 1;
        self.countdown <= 0
    }

    pub fn on_sdes(&mut self) {
        self.state = SessionState::Connected;
        self.rx_control_packets += 1;
        self.countdown = DEFAULT_RTCPTIMEOUT;
    }

    /// Buffer an inbound GSM voice frame and push a `Voice` frame into the
    /// read side once a full [`crate::rtp::GSM_FRAMES_PER_PACKET`]-frame
    /// packet has arrived. `samples` are one GSM block's decoded PCM.
    pub fn on_voice_packet(&mut self, samples: Vec<i16>, now_ms: u64) {
        self.rx_audio_packets += 1;
        self.jitter.on_packet(now_ms);
        self.outbox.push(Frame::Voice(samples));
    }

    pub fn on_bad_packet(&mut self) {
        self.rx_bad_packets += 1;
    }

    pub fn queue_outbound_gsm(&mut self, frame_bytes: &[u8]) {
        self.outbound_gsm.extend_from_slice(frame_bytes);
    }

    pub fn take_outbound_gsm(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound_gsm)
    }

    pub fn is_hung_up(&self) -> bool {
        self.hung_up
    }

    /// Surface a synthetic hangup through the `PeerChannel` read side, so
    /// the node controller's existing `(Link, Control(Hangup))` handling
    /// tears the link down the same way a keying-protocol hangup does.
    pub fn push_hangup_frame(&mut self) {
        self.hung_up = true;
        self.outbox.push(Frame::Control(ControlCode::Hangup));
    }
}

impl PeerChannel for EcholinkSession {
    fn try_read(&mut self) -> Option<Frame> {
        if self.outbox.is_empty() {
            None
        } else {
            Some(self.outbox.remove(0))
        }
    }

    fn write(&mut self, frame: Frame) {
        match frame {
            Frame::Control(ControlCode::Hangup) => self.hangup(),
            Frame::Voice(samples) => {
                self.tx_audio_packets += 1;
                self.queue_outbound_gsm(&placeholder_encode(&samples));
            }
            _ => {}
        }
    }

    fn hangup(&mut self) {
        self.hung_up = true;
    }

    fn rssi(&self) -> f32 {
        f32::MIN
    }
}

/// Thread-shared handle to one session: the driver thread owns the
/// socket I/O and the one call to `Instant::now()` (module doc comment);
/// the node controller thread only ever sees this as a [`PeerChannel`],
/// locked per call.
#[derive(Debug, Clone)]
pub struct SharedSession(pub Arc<Mutex<EcholinkSession>>);

impl SharedSession {
    pub fn new(session: EcholinkSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }
}

impl PeerChannel for SharedSession {
    fn try_read(&mut self) -> Option<Frame> {
        self.0.lock().try_read()
    }

    fn write(&mut self, frame: Frame) {
        self.0.lock().write(frame)
    }

    fn hangup(&mut self) {
        self.0.lock().hangup()
    }

    fn rssi(&self) -> f32 {
        self.0.lock().rssi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_allows_known_peer_with_empty_lists() {
        assert_eq!(admit(true, "W1ABC", &[], &[]), AdmitDecision::Admit);
    }

    #[test]
    fn admit_rejects_unknown_peer() {
        assert_eq!(admit(false, "W1ABC", &[], &[]), AdmitDecision::UnknownPeer);
    }

    #[test]
    fn admit_honors_deny_glob() {
        let deny = vec!["SPAM*".to_string()];
        assert_eq!(admit(true, "SPAMBOT", &deny, &[]), AdmitDecision::Denied);
    }

    #[test]
    fn admit_honors_nonempty_permit_list() {
        let permit = vec!["W1ABC".to_string()];
        assert_eq!(admit(true, "W1XYZ", &[], &permit), AdmitDecision::NotPermitted);
        assert_eq!(admit(true, "W1ABC", &[], &permit), AdmitDecision::Admit);
    }

    #[test]
    fn pending_table_caps_at_twenty_entries() {
        let mut table = PendingTable::new();
        for i in 0..25 {
            table.insert(Ipv4Addr::new(192, 0, 2, i as u8), format!("N{i}"), 0);
        }
        assert_eq!(table.len(), MAX_PENDING);
    }

    #[test]
    fn pending_table_bursts_on_first_tick_then_every_retry_interval() {
        let mut table = PendingTable::new();
        table.insert(Ipv4Addr::new(192, 0, 2, 11), "N0CALL".into(), 0);
        assert_eq!(table.tick(0), vec![Ipv4Addr::new(192, 0, 2, 11)]);
        assert!(table.tick(1_000).is_empty());
        assert_eq!(table.tick(AUTH_RETRY_MS), vec![Ipv4Addr::new(192, 0, 2, 11)]);
    }

    #[test]
    fn pending_table_abandons_after_timeout() {
        let mut table = PendingTable::new();
        table.insert(Ipv4Addr::new(192, 0, 2, 11), "N0CALL".into(), 0);
        table.tick(AUTH_ABANDONED_MS);
        assert!(table.is_empty());
    }

    #[test]
    fn heartbeat_counts_down_to_fatal() {
        let mut session = EcholinkSession::new_inbound(
            Ipv4Addr::new(192, 0, 2, 10),
            5198,
            "W1ABC".into(),
            caller_id_for_node("300001"),
        );
        assert_eq!(session.local_cid, "3300001");
        for _ in 0..DEFAULT_RTCPTIMEOUT - 1 {
            assert!(!session.heartbeat());
        }
        assert!(session.heartbeat());
    }

    #[test]
    fn outbound_session_starts_ringing_until_sdes() {
        let mut session = EcholinkSession::new_outbound(
            Ipv4Addr::new(192, 0, 2, 20),
            5198,
            "W1ABC".into(),
            caller_id_for_node("300002"),
        );
        assert_eq!(session.state, SessionState::Ringing);
        session.on_sdes();
        assert_eq!(session.state, SessionState::Connected);
    }
}
