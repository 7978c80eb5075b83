// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call mode, sys-state table, and the small sub-state-machines a
//! [`super::Node`] owns: sleep, parrot, TOT, ID (§3 "Invariants").

use crate::timers::Timer;

/// §3 "a call-mode enum {IDLE, DIAL, ALERT, UP, CONGEST}".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    #[default]
    Idle,
    Dial,
    Alert,
    Up,
    Congest,
}

/// One sys-state entry: a bitset of disables (§3 "10-element state table").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SysStateFlags {
    pub tx_disable: bool,
    pub rx_disable: bool,
    pub autopatch_disable: bool,
    pub link_disable: bool,
    pub telemetry_disable: bool,
    pub scheduler_disable: bool,
    pub cop_disable: bool,
    pub user_funs_disable: bool,
    pub alt_mac_disable: bool,
    pub sleep_disable: bool,
}

/// The 10 configured sys-states plus the current selection (`controlstates`
/// config key populates the table; `cop,2`-family commands select among them).
#[derive(Debug, Clone)]
pub struct SysStateTable {
    states: [SysStateFlags; 10],
    current: usize,
}

impl Default for SysStateTable {
    fn default() -> Self {
        Self {
            states: [SysStateFlags::default(); 10],
            current: 0,
        }
    }
}

impl SysStateTable {
    pub fn set(&mut self, index: usize, flags: SysStateFlags) {
        if index < self.states.len() {
            self.states[index] = flags;
        }
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.states.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> &SysStateFlags {
        &self.states[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }
}

/// Parrot (playback-your-own-last-transmission) sub-state (§3 Invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParrotMode {
    Disabled,
    /// Play back exactly once per keyup.
    Once,
    /// Play back every keyup.
    Always,
}

#[derive(Debug, Clone, Default)]
pub struct ParrotState {
    pub mode: Option<ParrotMode>,
    armed: bool,
    pub playing: bool,
}

impl ParrotState {
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Called on RX unkey; returns true exactly once per armed period for
    /// `ParrotMode::Once`, every time for `ParrotMode::Always`.
    pub fn should_play_on_unkey(&mut self) -> bool {
        match self.mode {
            None | Some(ParrotMode::Disabled) => false,
            Some(ParrotMode::Always) => true,
            Some(ParrotMode::Once) => {
                if self.armed {
                    self.armed = false;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Sleep sub-state (§3 Invariants: "absence of local RX and remote RX for
/// `sleeptime` seconds forces `local_tx = 0`; any remote-RX frame
/// immediately wakes the node").
#[derive(Debug, Clone, Default)]
pub struct SleepState {
    pub enabled: bool,
    pub sleeping: bool,
    pub timer: Timer,
}

impl SleepState {
    pub fn arm(&mut self, sleeptime_ms: u32) {
        if self.enabled {
            self.timer.start(sleeptime_ms);
        }
    }

    /// Call once per pass with whether RX or remote-RX was active. Wakes
    /// immediately on activity; otherwise lets the timer run down.
    pub fn tick(&mut self, rx_or_remote_active: bool, sleeptime_ms: u32) {
        if !self.enabled {
            self.sleeping = false;
            return;
        }
        if rx_or_remote_active {
            self.sleeping = false;
            self.timer.start(sleeptime_ms);
            return;
        }
        if self.timer.take_fired() {
            self.sleeping = true;
        }
    }
}

/// Total-timeout sub-state: tracks whether the post-trip notification has
/// played and whether an unkey/re-key cycle has happened since, which
/// gates re-arming per §4.1 step 4 / §4.5.
#[derive(Debug, Clone, Default)]
pub struct TotState {
    pub timer: Timer,
    pub notify_played: bool,
    pub unkeyed_since_trip: bool,
}

impl TotState {
    pub fn arm(&mut self, totime_ms: u32) {
        self.timer.start(totime_ms);
        self.notify_played = false;
        self.unkeyed_since_trip = true;
    }

    /// Returns true the pass TOT trips (0-crossing).
    pub fn tick(&mut self) -> bool {
        if self.timer.take_fired() {
            self.unkeyed_since_trip = false;
            true
        } else {
            false
        }
    }

    pub fn on_notify_played(&mut self) {
        self.notify_played = true;
    }

    pub fn on_unkey(&mut self) {
        self.unkeyed_since_trip = true;
    }
}

/// Identifier sub-state (§3 Invariants: ID before `idtime` elapses since
/// keyed; "polite" ID queued in tail if timer enters last `politeid` ms
/// while TX active and nobody is keyed).
#[derive(Debug, Clone, Default)]
pub struct IdState {
    pub timer: Timer,
    pub keyed_since_last_id: bool,
}

impl IdState {
    pub fn arm(&mut self, idtime_ms: u32) {
        self.timer.start(idtime_ms);
    }

    pub fn mark_keyed(&mut self) {
        self.keyed_since_last_id = true;
    }

    pub fn must_id(&mut self) -> bool {
        self.timer.take_fired() && self.keyed_since_last_id
    }

    /// Within the last `politeid_ms` of the window, with TX active and no
    /// user keyed, a polite ID should be queued.
    pub fn wants_polite_id(&self, politeid_ms: u32, tx_active: bool, user_keyed: bool) -> bool {
        self.keyed_since_last_id
            && tx_active
            && !user_keyed
            && self.timer.running()
            && self.timer.remaining_ms() <= politeid_ms
    }

    pub fn on_id_played(&mut self) {
        self.keyed_since_last_id = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_state_select_out_of_range_is_rejected() {
        let mut table = SysStateTable::default();
        assert!(!table.select(10));
        assert!(table.select(9));
        assert_eq!(table.current_index(), 9);
    }

    #[test]
    fn parrot_once_fires_a_single_time_per_arm() {
        let mut p = ParrotState { mode: Some(ParrotMode::Once), ..Default::default() };
        p.arm();
        assert!(p.should_play_on_unkey());
        assert!(!p.should_play_on_unkey());
        p.arm();
        assert!(p.should_play_on_unkey());
    }

    #[test]
    fn parrot_always_fires_every_time() {
        let mut p = ParrotState { mode: Some(ParrotMode::Always), ..Default::default() };
        assert!(p.should_play_on_unkey());
        assert!(p.should_play_on_unkey());
    }

    #[test]
    fn sleep_wakes_immediately_on_remote_rx() {
        let mut s = SleepState { enabled: true, ..Default::default() };
        s.arm(1000);
        s.timer.advance(1000);
        s.tick(false, 1000);
        assert!(s.sleeping, "P8: absence of RX for sleeptime forces sleep");
        s.tick(true, 1000);
        assert!(!s.sleeping, "P8: inbound peer voice clears sleep within one pass");
    }

    #[test]
    fn tot_trips_once_and_requires_unkey_to_rearm() {
        let mut t = TotState::default();
        t.arm(100);
        t.timer.advance(100);
        assert!(t.tick());
        t.on_notify_played();
        assert!(!t.unkeyed_since_trip);
        t.on_unkey();
        assert!(t.unkeyed_since_trip);
    }

    #[test]
    fn id_required_only_after_keyed_since_last_id() {
        let mut id = IdState::default();
        id.arm(100);
        id.timer.advance(100);
        assert!(!id.must_id(), "never keyed, no ID needed");

        let mut id2 = IdState::default();
        id2.arm(100);
        id2.mark_keyed();
        id2.timer.advance(100);
        assert!(id2.must_id());
    }
}
