// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The Echolink instance's audio/control socket loop (§4.4, §5 "one of
//! the driver's three long-lived threads"): binds the socket pair,
//! tracks the pending (unauthorized) table and the live session set, and
//! hands each admitted session to its caller as a [`SharedSession`] —
//! a [`rptr_core::channel::PeerChannel`] the node controller thread can
//! attach directly via `NodeController::attach_link_channel`, while this
//! thread keeps its own handle and continues pumping socket I/O into it.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rptr_core::channel::PeerChannel;

use crate::rtcp::{Bye, RtcpHeader, Sdes, PT_BYE, PT_SDES};
use crate::rtp::{AudioTextFrame, RtpHeader, RTP_HEADER_LEN};
use crate::session::{admit, caller_id_for_node, placeholder_decode, AdmitDecision, EcholinkSession, PendingTable, SharedSession};
use crate::socket;

const SOCKET_READ_TIMEOUT: Duration = Duration::from_millis(200);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
const MAX_PACKET: usize = 1500;

/// What a poll iteration produced, for the caller to react to.
pub struct PollOutcome {
    /// Newly admitted peers this iteration, named by callsign.
    pub new_sessions: Vec<(String, SharedSession)>,
}

/// Owns the audio/control UDP socket pair plus the pending table and the
/// live session map (§4.4, §3 "Pending (unauthorized) table").
pub struct EcholinkDriver {
    audio: UdpSocket,
    control: UdpSocket,
    callsign: String,
    local_cid: String,
    deny: Vec<String>,
    permit: Vec<String>,
    pending: PendingTable,
    /// Last-seen port for a pending (not yet admitted) peer, since
    /// `PendingTable` only keys on IP (§4.4).
    pending_ports: HashMap<Ipv4Addr, u16>,
    sessions: HashMap<Ipv4Addr, SharedSession>,
    started: Instant,
    last_heartbeat: Instant,
}

impl EcholinkDriver {
    pub fn new(
        bind_ip: Ipv4Addr,
        base_port: u16,
        callsign: impl Into<String>,
        node_name: &str,
        deny: Vec<String>,
        permit: Vec<String>,
    ) -> io::Result<Self> {
        let (audio, control) = socket::bind_instance(bind_ip, base_port)?;
        audio.set_read_timeout(Some(SOCKET_READ_TIMEOUT))?;
        control.set_read_timeout(Some(SOCKET_READ_TIMEOUT))?;
        Ok(Self {
            audio,
            control,
            callsign: callsign.into(),
            local_cid: caller_id_for_node(node_name),
            deny,
            permit,
            pending: PendingTable::new(),
            pending_ports: HashMap::new(),
            sessions: HashMap::new(),
            started: Instant::now(),
            last_heartbeat: Instant::now(),
        })
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// One pass: drain both sockets without blocking past
    /// [`SOCKET_READ_TIMEOUT`], then run the heartbeat if it's due.
    pub fn poll_once(&mut self) -> PollOutcome {
        let mut new_sessions = Vec::new();

        if let Some((from, bytes)) = self.try_recv(&self.control) {
            self.handle_control_packet(from, &bytes, &mut new_sessions);
        }
        if let Some((from, bytes)) = self.try_recv(&self.audio) {
            self.handle_audio_packet(from, &bytes);
        }

        if self.last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            self.last_heartbeat = Instant::now();
            self.run_heartbeat();
        }

        PollOutcome { new_sessions }
    }

    fn try_recv(&self, socket: &UdpSocket) -> Option<(SocketAddr, Vec<u8>)> {
        let mut buf = [0u8; MAX_PACKET];
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => Some((from, buf[..len].to_vec())),
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => None,
            Err(err) => {
                log::warn!("echolink {}: socket read error: {err}", self.callsign);
                None
            }
        }
    }

    fn peer_ip(addr: SocketAddr) -> Option<Ipv4Addr> {
        match addr.ip() {
            std::net::IpAddr::V4(v4) => Some(v4),
            std::net::IpAddr::V6(_) => None,
        }
    }

    fn handle_control_packet(&mut self, from: SocketAddr, bytes: &[u8], new_sessions: &mut Vec<(String, SharedSession)>) {
        let Some(ip) = Self::peer_ip(from) else { return };
        let Ok(header) = RtcpHeader::from_bytes(bytes) else { return };
        match header.packet_type {
            PT_SDES => {
                let Ok(sdes) = Sdes::from_bytes(bytes) else { return };
                let callsign = sdes.cname.split_whitespace().next().unwrap_or(&sdes.cname).to_string();
                self.on_sdes(ip, from.port(), callsign, new_sessions);
            }
            PT_BYE => {
                if let Some(session) = self.sessions.get(&ip) {
                    session.0.lock().push_hangup_frame();
                }
                self.sessions.remove(&ip);
            }
            other => log::debug!("echolink {}: ignoring RTCP type {other} from {from}", self.callsign),
        }
    }

    /// Inbound SDES from `ip`: promote an already-admitted session, or
    /// run the admit check for a first contact (§4.4 "inbound SDES from
    /// unknown IP").
    ///
    /// TODO: `known` is hardcoded true until the directory client
    /// (`crate::directory_client`) is wired into this driver with real
    /// server credentials; deny/permit lists are still enforced.
    fn on_sdes(&mut self, ip: Ipv4Addr, port: u16, callsign: String, new_sessions: &mut Vec<(String, SharedSession)>) {
        if let Some(session) = self.sessions.get(&ip) {
            session.0.lock().on_sdes();
            return;
        }

        match admit(true, &callsign, &self.deny, &self.permit) {
            AdmitDecision::Admit => {
                let session = SharedSession::new(EcholinkSession::new_inbound(ip, port, callsign.clone(), self.local_cid.clone()));
                self.sessions.insert(ip, session.clone());
                new_sessions.push((callsign, session));
            }
            decision => {
                log::debug!("echolink {}: rejecting {callsign}@{ip}: {decision:?}", self.callsign);
                self.pending_ports.insert(ip, port);
                self.pending.insert(ip, callsign, self.now_ms());
            }
        }
    }

    fn handle_audio_packet(&mut self, from: SocketAddr, bytes: &[u8]) {
        let Some(ip) = Self::peer_ip(from) else { return };
        if let Some(text) = AudioTextFrame::parse(bytes) {
            if let Some(session) = self.sessions.get(&ip) {
                session.0.lock().write(rptr_core::channel::Frame::Text(text.text));
            }
            return;
        }
        let Ok(header) = RtpHeader::from_bytes(bytes) else { return };
        if !header.is_voice() || bytes.len() <= RTP_HEADER_LEN {
            return;
        }
        let samples = placeholder_decode(&bytes[RTP_HEADER_LEN..]);
        if let Some(session) = self.sessions.get(&ip) {
            session.0.lock().on_voice_packet(samples, self.now_ms());
        }
    }

    /// ~1Hz tick (§4.4): age the pending table (bursting BYE to anyone
    /// due), and decrement each live session's keepalive countdown,
    /// tearing down and BYE-bursting any that expired.
    fn run_heartbeat(&mut self) {
        let now_ms = self.now_ms();
        for ip in self.pending.tick(now_ms) {
            if let Some(&port) = self.pending_ports.get(&ip) {
                self.send_bye_burst(SocketAddr::new(ip.into(), port), 0, "UN-AUTHORIZED");
            }
        }
        let pending = &self.pending;
        self.pending_ports.retain(|ip, _| pending.contains(*ip));

        let mut expired = Vec::new();
        for (ip, session) in self.sessions.iter() {
            let mut guard = session.0.lock();
            if guard.heartbeat() {
                guard.push_hangup_frame();
                expired.push(*ip);
            }
        }
        for ip in expired {
            if let Some(session) = self.sessions.remove(&ip) {
                let (port, ssrc) = {
                    let guard = session.0.lock();
                    (guard.peer_port, 0)
                };
                self.send_bye_burst(SocketAddr::new(ip.into(), port), ssrc, "TIMEOUT");
            }
        }
    }

    fn send_bye_burst(&self, to: SocketAddr, ssrc: u32, reason: &str) {
        for packet in Bye::burst(ssrc, Some(reason)) {
            let _ = self.control.send_to(&packet, to);
        }
    }

    /// Flush every session's queued outbound GSM bytes onto the audio
    /// socket as RTP voice packets.
    pub fn flush_outbound(&mut self) {
        for (ip, session) in self.sessions.iter() {
            let mut guard = session.0.lock();
            let bytes = guard.take_outbound_gsm();
            if bytes.is_empty() {
                continue;
            }
            let header = RtpHeader::new_voice(guard.out_sequence, 0, 0);
            guard.out_sequence = guard.out_sequence.wrapping_add(1);
            let mut packet = header.to_bytes().to_vec();
            packet.extend_from_slice(&bytes);
            let _ = self.audio.send_to(&packet, SocketAddr::new((*ip).into(), guard.peer_port));
        }
    }

    /// Run until `should_stop` reports true, sending each admitted
    /// session to `new_session_tx` for the caller (the node worker
    /// thread) to attach as a link channel.
    pub fn run(&mut self, should_stop: impl Fn() -> bool, new_session_tx: &Sender<(String, Box<dyn PeerChannel>)>) {
        while !should_stop() {
            let outcome = self.poll_once();
            for (name, session) in outcome.new_sessions {
                let _ = new_session_tx.send((name, Box::new(session)));
            }
            self.flush_outbound();
        }
    }
}
