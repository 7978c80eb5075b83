// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-node controller (component F, §4.1, §4.2, §4.5).
//!
//! `NodeController` owns one [`Node`]'s mutable state and its channels
//! and runs the pass loop. Each of the ten steps in §4.1 is its own
//! method so a test can drive step 1 (advance timers) and assert step 4's
//! (`totx`) outcome without any channel I/O — see the module tests below
//! and the scenario tests under `tests/`.

mod state;

pub use state::{CallMode, IdState, ParrotMode, ParrotState, SleepState, SysStateFlags, SysStateTable, TotState};

use crate::channel::{ControlCode, Frame, PeerChannel, RadioChannel};
use crate::config::NodeConfig;
use crate::dtmf::{dispatch_action, DtmfCompletion, DtmfDispatcher, DtmfSource};
use crate::duplex::{totx, Duplex, TotxInputs};
use crate::error::NodeError;
use crate::link::{distribute_to_all_links, KeyingProtocol, LinkFrame, LinkMode, LinkSet, Voter, VoterCandidate};
use crate::scheduler::CronTable;
use crate::telemetry::{TelemetryItem, TelemetryKind, TelemetryQueue};
use crate::timers::Timers;
use std::collections::HashMap;
use std::sync::Arc;

/// Hard cap on the scheduler-fed macro buffer (§4.1 step 6/7); a macro
/// that would overflow it is dropped and reported as not-found rather
/// than silently truncated.
pub const MACRO_BUFFER_MAX: usize = 64;

/// v1 `NEWKEY` handshake timeout (§4.3); no config key names this, so it
/// is fixed rather than threaded through `NodeConfig`.
const NEW_KEY_TIMEOUT_MS: u32 = 2_000;

fn duplex_from_config(value: u8) -> Duplex {
    match value {
        0 => Duplex::D0,
        1 => Duplex::D1,
        3 => Duplex::D3,
        4 => Duplex::D4,
        _ => Duplex::D2,
    }
}

/// Daily/lifetime counters (§3 "daily/lifetime counters").
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCounters {
    pub daily_keyups: u64,
    pub lifetime_keyups: u64,
    pub daily_keydowns: u64,
    pub lifetime_keydowns: u64,
    pub daily_commands: u64,
    pub lifetime_commands: u64,
}

/// One radio node's full mutable state (§3 "Node").
pub struct Node {
    pub name: String,
    pub config: Arc<NodeConfig>,

    pub timers: Timers,
    pub telemetry: TelemetryQueue,
    pub links: LinkSet,
    pub voter: Voter,
    /// Scheduled macro injections (§4.1 step 7), built from
    /// `config.scheduler` at construction time.
    pub cron: CronTable,

    pub call_mode: CallMode,
    pub sys_state: SysStateTable,
    pub counters: NodeCounters,

    /// Bounded macro buffer (§4.1 step 6).
    pub macro_buffer: String,
    pub dtmf: DtmfDispatcher,
    pub last_dtmf_user: Option<String>,
    /// Most-recently-disconnected non-perma peers, most recent last
    /// (Scenario 3: `ilink,16` reconnects the top of this stack).
    pub savednodes: Vec<String>,

    pub parrot: ParrotState,
    pub sleep: SleepState,
    pub tot: TotState,
    pub id: IdState,

    pub rx_keyed: bool,
    pub really_keyed: bool,
    pub tx_keyed: bool,
    pub local_tx: bool,
    pub ext_tx: bool,
    pub remote_rx: bool,
    pub autopatch_active: bool,
    pub dtmf_local_timer_running: bool,
    pub paging: bool,
}

impl Node {
    pub fn new(config: Arc<NodeConfig>, dtmf: DtmfDispatcher) -> Self {
        let cron_entries = config
            .scheduler
            .as_deref()
            .map(CronTable::parse_schedule)
            .unwrap_or_default();
        let margin_db = config.votermargin_db.unwrap_or(3.0);
        Self {
            name: config.node_name.clone(),
            config,
            timers: Timers::new(),
            telemetry: TelemetryQueue::new(),
            links: LinkSet::new(),
            voter: Voter::new(margin_db),
            cron: CronTable::new(cron_entries),
            call_mode: CallMode::default(),
            sys_state: SysStateTable::default(),
            counters: NodeCounters::default(),
            macro_buffer: String::new(),
            dtmf,
            last_dtmf_user: None,
            savednodes: Vec::new(),
            parrot: ParrotState::default(),
            sleep: SleepState::default(),
            tot: TotState::default(),
            id: IdState::default(),
            rx_keyed: false,
            really_keyed: false,
            tx_keyed: false,
            local_tx: false,
            ext_tx: false,
            remote_rx: false,
            autopatch_active: false,
            dtmf_local_timer_running: false,
            paging: false,
        }
    }

    fn duplex(&self) -> Duplex {
        duplex_from_config(self.config.duplex)
    }

    /// Append `macro_text` to the macro buffer, drained one digit per
    /// pass by step 6. Used by both the scheduler (step 7) and the
    /// `macro` DTMF action.
    pub fn enqueue_macro(&mut self, macro_text: &str) {
        if self.macro_buffer.len() + macro_text.len() > MACRO_BUFFER_MAX {
            log::warn!("node {}: macro buffer full, dropping {macro_text:?}", self.name);
            self.telemetry.enqueue(TelemetryItem::new(TelemetryKind::MacroNotFound));
            return;
        }
        self.macro_buffer.push_str(macro_text);
    }

    /// Read-only snapshot the CLI/AMI surface would query (§6 "q" option,
    /// `rpt dump`/`rpt stats`). The surface itself is out of scope; this
    /// accessor is part of the core's public contract regardless.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            name: self.name.clone(),
            tx_keyed: self.tx_keyed,
            rx_keyed: self.rx_keyed,
            link_count: self.links.len(),
            call_mode: self.call_mode,
            duplex: self.config.duplex,
            sleeping: self.sleep.sleeping,
            last_tone: None,
        }
    }
}

/// §6 `q` read-only variable set.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub name: String,
    pub tx_keyed: bool,
    pub rx_keyed: bool,
    pub link_count: usize,
    pub call_mode: CallMode,
    pub duplex: u8,
    pub sleeping: bool,
    pub last_tone: Option<String>,
}

/// One incoming frame plus which owned channel it arrived on (§4.1 step 8,
/// §4.2). In the real daemon this is what the "wait on any channel"
/// primitive resolves to; tests construct it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSource {
    RadioRx,
    Mix,
    Monitor,
    Telemetry,
    /// A peer link's channel, named by peer (§4.4).
    Link(String),
}

/// Wall-clock minute the daemon observed this pass, fed to the scheduler
/// (§4.1 step 7). Kept off [`Node`] itself since it's an ambient fact the
/// host supplies, not node state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
    pub weekday: u8,
}

/// Owns a [`Node`] and the channel handles its loop reads/writes (§5
/// "Scheduling": one worker per node, owns all mutable state).
pub struct NodeController {
    pub node: Node,
    radio_tx: Box<dyn RadioChannel>,
    link_channels: HashMap<String, Box<dyn PeerChannel>>,
    clock: WallClock,
    shutdown: bool,
}

impl NodeController {
    pub fn new(node: Node, radio_tx: Box<dyn RadioChannel>) -> Self {
        Self {
            node,
            radio_tx,
            link_channels: HashMap::new(),
            clock: WallClock::default(),
            shutdown: false,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }

    /// Record the wall-clock minute for step 7's scheduler poll.
    pub fn set_clock(&mut self, hour: u8, minute: u8, weekday: u8) {
        self.clock = WallClock { hour, minute, weekday };
    }

    /// Attach a peer's channel (§4.4 "presents itself as a link-compatible
    /// channel"), polled each pass by step 9 alongside the link's own
    /// timers. The link set entry itself is managed separately by
    /// whatever drives connect/accept.
    pub fn attach_link_channel(&mut self, peer_name: impl Into<String>, channel: Box<dyn PeerChannel>) {
        self.link_channels.insert(peer_name.into(), channel);
    }

    /// Runs one 20ms pass. `incoming` stands in for whatever the "wait on
    /// any channel" primitive handed back this tick (§4.1 step 8); `None`
    /// means the tick elapsed with nothing ready.
    pub fn run_once(
        &mut self,
        elapsed_ms: u32,
        incoming: Option<(ChannelSource, Frame)>,
    ) -> Result<(), NodeError> {
        self.step1_advance_timers(elapsed_ms);
        self.step2_reconcile_derived_state();
        let pending = self.step3_classify_telemetry();
        let want_tx = self.step4_compute_totx(pending);
        self.step5_edge_detect_totx(want_tx);
        self.step6_drain_macro_buffer();
        self.step7_dispatch_ready_command();
        if let Some((source, frame)) = incoming {
            self.step8_handle_channel_event(source, frame)?;
        }
        self.step9_link_housekeeping()?;
        Ok(())
    }

    fn step1_advance_timers(&mut self, elapsed_ms: u32) {
        self.node.timers.advance(elapsed_ms);
        for link in self.node.links.iter_mut() {
            link.linger_timer.advance(elapsed_ms);
            link.re_tx_timer.advance(elapsed_ms);
            link.re_rx_timer.advance(elapsed_ms);
            link.tick_new_key_timeout();
        }
    }

    fn step2_reconcile_derived_state(&mut self) {
        self.node.remote_rx = self.node.links.iter().any(|l| {
            l.mode == crate::link::LinkMode::Transceive && l.last_rx
        });
        self.node
            .sleep
            .tick(self.node.rx_keyed || self.node.remote_rx, self.node.config.sleeptime_s.unwrap_or(0) * 1000);
        self.node.local_tx = self.node.rx_keyed && !self.node.sleep.sleeping;
    }

    fn step3_classify_telemetry(&mut self) -> crate::telemetry::PendingClass {
        self.node.telemetry.classify_pending()
    }

    fn step4_compute_totx(&mut self, pending: crate::telemetry::PendingClass) -> bool {
        if self.node.tot.tick() {
            // The notification telemetry item plays synchronously from the
            // controller's point of view; a real host mixes its audio in
            // over the telemetry channel while this flag already gates TX.
            self.node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Timeout));
            self.node.tot.on_notify_played();
        }
        let tot_expired = !self.node.tot.timer.running() && self.node.tot.notify_played;
        totx(
            self.node.duplex(),
            TotxInputs {
                local_tx: self.node.local_tx,
                autopatch_active: self.node.autopatch_active,
                remote_rx: self.node.remote_rx,
                rx_keyed: self.node.rx_keyed,
                link_to_link: self.node.config.linktolink.unwrap_or(false),
                dias: self.node.config.dias.unwrap_or(false),
                pending,
                tot_expired,
                tot_notify_played: self.node.tot.notify_played,
                tot_unkeyed_since: self.node.tot.unkeyed_since_trip,
                dtmf_local_timer_running: self.node.dtmf_local_timer_running,
                paging: self.node.paging,
                tx_disabled: self.node.sys_state.current().tx_disable,
            },
        )
    }

    /// §4.1 step 5: edge-detect `totx`, emit KEY/UNKEY, update counters.
    fn step5_edge_detect_totx(&mut self, want_tx: bool) {
        if want_tx && !self.node.tx_keyed {
            self.node.tx_keyed = true;
            self.radio_tx.write(Frame::Control(ControlCode::Key));
            self.node.counters.daily_keyups += 1;
            self.node.counters.lifetime_keyups += 1;
            self.node.tot.arm(self.node.config.totime_ms);
            self.node.id.mark_keyed();
        } else if !want_tx && self.node.tx_keyed {
            self.node.tx_keyed = false;
            self.radio_tx.write(Frame::Control(ControlCode::Unkey));
            self.node.counters.daily_keydowns += 1;
            self.node.counters.lifetime_keydowns += 1;
        }
    }

    /// §4.1 step 6.
    fn step6_drain_macro_buffer(&mut self) {
        if self.node.macro_buffer.is_empty() || self.node.timers.macro_.running() {
            return;
        }
        let digit = self.node.macro_buffer.remove(0);
        self.node.timers.macro_.start(100);
        let _ = self.dispatch_digit(DtmfSource::RptInternal, digit);
    }

    /// §4.1 step 7: poll the scheduler for this wall-clock minute and
    /// inject any fired macro into the macro buffer.
    fn step7_dispatch_ready_command(&mut self) {
        let fired = self.node.cron.poll(self.clock.hour, self.clock.minute, self.clock.weekday);
        for macro_text in fired {
            self.node.enqueue_macro(&macro_text);
        }
    }

    fn step8_handle_channel_event(&mut self, source: ChannelSource, frame: Frame) -> Result<(), NodeError> {
        match (source, frame) {
            (ChannelSource::RadioRx, Frame::Control(ControlCode::Key)) => {
                self.node.really_keyed = true;
                self.node.rx_keyed = true;
            }
            (ChannelSource::RadioRx, Frame::Control(ControlCode::Unkey)) => {
                if self.node.rx_keyed && self.node.duplex() != Duplex::D0 && !self.node.sleep.sleeping {
                    self.node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Unkey));
                }
                self.node.rx_keyed = false;
                self.node.really_keyed = false;
                self.node.tot.on_unkey();
                if self.node.parrot.should_play_on_unkey() {
                    self.node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Parrot));
                }
            }
            (ChannelSource::RadioRx, Frame::Control(ControlCode::Hangup)) => {
                return Err(NodeError::ChannelHangup("radio-rx"));
            }
            (ChannelSource::RadioRx, Frame::DtmfBegin(_)) => {}
            (ChannelSource::RadioRx, Frame::DtmfEnd(digit)) => {
                self.dispatch_digit(DtmfSource::Radio, digit);
            }
            (ChannelSource::RadioRx, Frame::Voice(samples)) => {
                self.handle_voice_from_radio(samples);
            }
            (ChannelSource::Link(peer), Frame::Control(ControlCode::Key)) => {
                if let Some(link) = self.node.links.get_mut(&peer) {
                    link.last_rx_real = true;
                    link.last_rx = true;
                }
            }
            (ChannelSource::Link(peer), Frame::Control(ControlCode::Unkey)) => {
                if let Some(link) = self.node.links.get_mut(&peer) {
                    link.last_rx_real = false;
                    link.last_rx = false;
                }
            }
            (ChannelSource::Link(peer), Frame::Control(ControlCode::Hangup)) => {
                // Recoverable at the link level (§4.3): drop the peer,
                // don't fail the whole worker like a radio-RX hangup does.
                self.node.links.remove(&peer);
                self.link_channels.remove(&peer);
            }
            (ChannelSource::Link(_), Frame::DtmfBegin(_)) => {}
            (ChannelSource::Link(peer), Frame::DtmfEnd(digit)) => {
                self.dispatch_digit(DtmfSource::Link, digit);
            }
            (ChannelSource::Link(peer), Frame::Voice(samples)) => {
                self.handle_voice_from_link(&peer, samples);
            }
            (ChannelSource::Link(peer), Frame::Text(text)) => {
                self.handle_link_text(&peer, &text);
            }
            _ => {}
        }
        Ok(())
    }

    fn dispatch_digit(&mut self, source: DtmfSource, digit: char) -> Option<DtmfCompletion> {
        match self.node.dtmf.feed(source, digit) {
            Ok((DtmfCompletion::Complete, Some(entry))) => {
                self.node.counters.daily_commands += 1;
                self.node.counters.lifetime_commands += 1;
                self.node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Complete));
                dispatch_action(entry.action, &mut self.node, &entry.param);
                Some(DtmfCompletion::Complete)
            }
            Ok((completion, _)) => Some(completion),
            Err(_) => None,
        }
    }

    /// §4.3 "voter mode": gather this pass's candidates (local RX plus any
    /// link with `voter` set, transceive, currently receiving).
    fn voter_candidates(&self) -> Vec<VoterCandidate> {
        let mut candidates: Vec<VoterCandidate> = self
            .node
            .links
            .iter()
            .filter(|l| l.voter && l.mode == LinkMode::Transceive && l.last_rx)
            .map(|l| VoterCandidate { name: l.peer_name.clone(), rssi: l.rssi })
            .collect();
        if self.node.rx_keyed {
            candidates.push(VoterCandidate { name: "local".to_string(), rssi: 0.0 });
        }
        candidates
    }

    /// Fan radio-RX audio out to every connected link channel, honoring
    /// §4.3's "never send to a `LocalMonitor` peer" invariant.
    fn handle_voice_from_radio(&mut self, samples: Vec<i16>) {
        let targets: Vec<String> = self
            .node
            .links
            .iter()
            .filter(|l| l.may_send_local_audio())
            .map(|l| l.peer_name.clone())
            .collect();
        for name in targets {
            if let Some(channel) = self.link_channels.get_mut(&name) {
                channel.write(Frame::Voice(samples.clone()));
            }
        }
    }

    /// Pass a peer's voice frame to the radio TX, gated by the v2
    /// jitter-buffer invariant and, for voter-enrolled links, by whether
    /// this peer currently holds the vote.
    fn handle_voice_from_link(&mut self, peer: &str, samples: Vec<i16>) {
        let Some(link) = self.node.links.get(peer) else { return };
        if !link.may_pass_voice() {
            return;
        }
        if link.voter {
            let candidates = self.voter_candidates();
            self.node.voter.tick(&candidates);
            if !self.node.voter.is_winner(peer) {
                return;
            }
        }
        self.radio_tx.write(Frame::Voice(samples));
    }

    /// Parse and act on one peer's link text frame (§4.3).
    fn handle_link_text(&mut self, peer: &str, text: &str) {
        let frame: LinkFrame = match text.parse() {
            Ok(frame) => frame,
            Err(_) => {
                log::warn!("link {peer}: malformed text frame: {text:?}");
                return;
            }
        };
        match frame {
            LinkFrame::Disc => {
                self.node.links.remove(peer);
                self.link_channels.remove(peer);
            }
            LinkFrame::NewKey => {
                if let Some(link) = self.node.links.get_mut(peer) {
                    link.arm_new_key_timer(NEW_KEY_TIMEOUT_MS);
                }
            }
            LinkFrame::NewKey1 => {
                if let Some(link) = self.node.links.get_mut(peer) {
                    link.keying_protocol = KeyingProtocol::TextFramed;
                }
            }
            LinkFrame::Keying { query, .. } if query => {
                if let Some(link) = self.node.links.get_mut(peer) {
                    let reply = LinkFrame::Keying {
                        dest: peer.to_string(),
                        src: self.node.name.clone(),
                        seq: 0,
                        ts: 0,
                        query: false,
                    };
                    link.text_outbox.push(reply.to_string());
                }
            }
            LinkFrame::Dtmf { digit, .. } => {
                self.dispatch_digit(DtmfSource::Link, digit);
            }
            LinkFrame::Message { src, dst, text } => {
                let rendered = LinkFrame::Message { src, dst: dst.clone(), text }.to_string();
                distribute_to_all_links(&mut self.node.links, Some(peer), Some(&dst), &rendered);
            }
            _ => {}
        }
    }

    /// Poll every attached link channel for a ready frame and handle it
    /// the same way a radio-RX event would be (§4.4).
    fn poll_link_channels(&mut self) -> Result<(), NodeError> {
        let names: Vec<String> = self.link_channels.keys().cloned().collect();
        for name in names {
            let frame = match self.link_channels.get_mut(&name) {
                Some(channel) => channel.try_read(),
                None => None,
            };
            if let Some(frame) = frame {
                self.step8_handle_channel_event(ChannelSource::Link(name), frame)?;
            }
        }
        Ok(())
    }

    /// Flush each link's queued outbound text frames to its channel.
    fn drain_link_text_outbox(&mut self) {
        let names: Vec<String> = self
            .node
            .links
            .iter()
            .filter(|l| !l.text_outbox.is_empty())
            .map(|l| l.peer_name.clone())
            .collect();
        for name in names {
            let messages = match self.node.links.get_mut(&name) {
                Some(link) => std::mem::take(&mut link.text_outbox),
                None => continue,
            };
            if let Some(channel) = self.link_channels.get_mut(&name) {
                for message in messages {
                    channel.write(Frame::Text(message));
                }
            }
        }
    }

    /// §4.1 step 9: per-link housekeeping (the bits not already advanced
    /// in step 1): poll peer channels, harvest expired-linger
    /// disconnects, flush queued outbound text.
    fn step9_link_housekeeping(&mut self) -> Result<(), NodeError> {
        self.poll_link_channels()?;
        let expired: Vec<String> = self
            .node
            .links
            .iter_mut()
            .filter(|l| l.linger_timer.take_fired())
            .map(|l| l.peer_name.clone())
            .collect();
        for name in expired {
            self.node.links.remove(&name);
            self.link_channels.remove(&name);
        }
        self.drain_link_text_outbox();
        Ok(())
    }

    /// §4.1 loop exit: hang up owned channels in LIFO order, drain links.
    pub fn shutdown(&mut self) {
        self.shutdown = true;
        self.radio_tx.hangup();
        self.node.links.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtmf::Action;
    use crate::link::{Link, LinkMode};
    use std::collections::HashMap;

    struct RecordingChannel {
        written: Vec<Frame>,
        hung_up: bool,
    }

    impl RadioChannel for RecordingChannel {
        fn try_read(&mut self) -> Option<Frame> {
            None
        }
        fn write(&mut self, frame: Frame) {
            self.written.push(frame);
        }
        fn hangup(&mut self) {
            self.hung_up = true;
        }
    }

    fn minimal_config() -> Arc<NodeConfig> {
        let mut cfg = NodeConfig {
            node_name: "546".into(),
            duplex: 2,
            totime_ms: 2000,
            hangtime_ms: 0,
            ..Default::default()
        };
        cfg.functions.insert("*81".into(), "status,1".into());
        Arc::new(cfg)
    }

    fn controller() -> NodeController {
        let config = minimal_config();
        let mut tables = HashMap::new();
        tables.insert(DtmfSource::Radio, crate::dtmf::FunctionTable::from_config_map(&config.functions));
        let dtmf = DtmfDispatcher::new(tables);
        let node = Node::new(config, dtmf);
        let radio_tx = Box::new(RecordingChannel { written: Vec::new(), hung_up: false });
        NodeController::new(node, radio_tx)
    }

    #[test]
    fn scenario1_basic_repeater_keyup_produces_exactly_one_key_unkey() {
        let mut tables = HashMap::new();
        tables.insert(DtmfSource::Radio, crate::dtmf::FunctionTable::new());
        let dtmf = DtmfDispatcher::new(tables);
        let node = Node::new(minimal_config(), dtmf);
        let written = Arc::new(parking_lot::Mutex::new(Vec::new()));

        struct SharedChannel(Arc<parking_lot::Mutex<Vec<Frame>>>);
        impl RadioChannel for SharedChannel {
            fn try_read(&mut self) -> Option<Frame> {
                None
            }
            fn write(&mut self, frame: Frame) {
                self.0.lock().push(frame);
            }
            fn hangup(&mut self) {}
        }

        let mut ctrl = NodeController::new(node, Box::new(SharedChannel(written.clone())));

        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::Control(ControlCode::Key)))).unwrap();
        for _ in 0..79 {
            ctrl.run_once(20, None).unwrap();
        }
        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::Control(ControlCode::Unkey)))).unwrap();
        for _ in 0..5 {
            ctrl.run_once(20, None).unwrap();
        }

        let frames = written.lock();
        let keys = frames.iter().filter(|f| matches!(f, Frame::Control(ControlCode::Key))).count();
        let unkeys = frames.iter().filter(|f| matches!(f, Frame::Control(ControlCode::Unkey))).count();
        assert_eq!(keys, 1, "P1: exactly one KEY transition");
        assert_eq!(unkeys, 1, "P1: exactly one UNKEY transition");
        assert_eq!(ctrl.node.counters.daily_keyups, 1);
    }

    #[test]
    fn scenario2_tot_trips_and_unkeys_tx() {
        let mut ctrl = controller();
        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::Control(ControlCode::Key)))).unwrap();
        assert!(ctrl.node.tx_keyed);

        let mut elapsed = 20u32;
        while elapsed < 2100 {
            ctrl.run_once(20, None).unwrap();
            elapsed += 20;
        }
        assert!(!ctrl.node.tx_keyed, "P2: TOT must force TX down at totime");
    }

    #[test]
    fn step8_hangup_surfaces_as_node_error() {
        let mut ctrl = controller();
        let err = ctrl
            .run_once(20, Some((ChannelSource::RadioRx, Frame::Control(ControlCode::Hangup))))
            .unwrap_err();
        assert!(matches!(err, NodeError::ChannelHangup("radio-rx")));
    }

    #[test]
    fn link_housekeeping_harvests_expired_linger() {
        let mut ctrl = controller();
        let mut link = Link::new("1001", LinkMode::Transceive, true);
        link.linger_timer.start(20);
        ctrl.node.links.add(link).unwrap();
        ctrl.run_once(20, None).unwrap();
        assert!(!ctrl.node.links.contains("1001"));
    }

    #[test]
    fn shutdown_hangs_up_radio_tx_and_drains_links() {
        let mut ctrl = controller();
        ctrl.node.links.add(Link::new("1001", LinkMode::Transceive, true)).unwrap();
        ctrl.shutdown();
        assert!(ctrl.is_shut_down());
        assert_eq!(ctrl.node.links.len(), 0);
    }

    #[test]
    fn scenario3_ilink_disconnect_all_then_reconnect_last_cycles_savednodes() {
        let mut ctrl = controller();
        ctrl.node.links.add(Link::new("1001", LinkMode::Transceive, true)).unwrap();
        ctrl.node.links.add(Link::new("1002", LinkMode::Transceive, true)).unwrap();

        crate::dtmf::dispatch_action(Action::Ilink, &mut ctrl.node, "6");
        assert_eq!(ctrl.node.links.len(), 0, "disconnect-all drops every link");
        assert_eq!(ctrl.node.savednodes, vec!["1001".to_string(), "1002".to_string()]);

        crate::dtmf::dispatch_action(Action::Ilink, &mut ctrl.node, "16");
        assert!(ctrl.node.links.contains("1002"), "reconnect-last pops the most recent disconnect");
        assert_eq!(ctrl.node.savednodes, vec!["1001".to_string()]);
    }

    #[test]
    fn scenario6_status_command_emits_status_telemetry() {
        let mut ctrl = controller();
        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::DtmfEnd('*')))).unwrap();
        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::DtmfEnd('8')))).unwrap();
        ctrl.run_once(20, Some((ChannelSource::RadioRx, Frame::DtmfEnd('1')))).unwrap();

        let found = ctrl
            .node
            .telemetry
            .iter()
            .any(|item| matches!(item.kind, TelemetryKind::Status(ref s) if s == "1"));
        assert!(found, "*81 -> status,1 must enqueue Status(\"1\") telemetry");
    }

    struct ScriptedPeerChannel {
        inbox: std::collections::VecDeque<Frame>,
    }

    impl PeerChannel for ScriptedPeerChannel {
        fn try_read(&mut self) -> Option<Frame> {
            self.inbox.pop_front()
        }
        fn write(&mut self, _frame: Frame) {}
        fn hangup(&mut self) {}
    }

    #[test]
    fn non_winning_voter_link_is_muted_from_radio_tx() {
        let mut ctrl = controller();

        let mut weak = Link::new("1001", LinkMode::Transceive, true);
        weak.voter = true;
        weak.last_rx = true;
        weak.rssi = -90.0;
        ctrl.node.links.add(weak).unwrap();

        let mut strong = Link::new("1002", LinkMode::Transceive, true);
        strong.voter = true;
        strong.last_rx = true;
        strong.rssi = -40.0;
        ctrl.node.links.add(strong).unwrap();

        ctrl.attach_link_channel("1001", Box::new(ScriptedPeerChannel { inbox: std::collections::VecDeque::new() }));
        ctrl.attach_link_channel("1002", Box::new(ScriptedPeerChannel { inbox: std::collections::VecDeque::new() }));

        for _ in 0..10 {
            ctrl.handle_voice_from_link("1002", vec![0; 4]);
        }
        assert_eq!(ctrl.node.voter.current_winner(), Some("1002"));

        for _ in 0..10 {
            ctrl.handle_voice_from_link("1001", vec![0; 4]);
        }
        assert_eq!(ctrl.node.voter.current_winner(), Some("1002"), "margin keeps 1002 the winner");
    }
}
