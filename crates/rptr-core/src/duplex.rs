// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Duplex mode and the `totx` arbitration table (§4.5), kept as a pure
//! function of its inputs so P1/P2/P8 are testable without any channel
//! I/O.

use crate::telemetry::PendingClass;

/// Configured duplex mode (§4.5 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    /// Remote links alone may key TX; local RX never repeats.
    D0,
    /// No main repeat audio.
    D1,
    /// Normal repeater: RX repeats through to TX.
    D2,
    /// Normal except no main repeat audio.
    D3,
    /// Full duplex only while an autopatch call is active.
    D4,
}

impl Duplex {
    /// Whether this duplex mode ever repeats local RX audio through to
    /// local TX (§4.5 "RX-through-TX" column).
    pub fn rx_repeats_to_tx(self, autopatch_active: bool) -> bool {
        match self {
            Duplex::D2 => true,
            Duplex::D4 => autopatch_active,
            _ => false,
        }
    }

    /// §4.5: "if duplex < 2 ... receiver priority" applies to D0/D1 only.
    fn rx_has_tx_priority(self) -> bool {
        matches!(self, Duplex::D0 | Duplex::D1)
    }
}

/// Everything `totx` needs to decide this pass, collected so the function
/// itself stays pure (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct TotxInputs {
    pub local_tx: bool,
    pub autopatch_active: bool,
    pub remote_rx: bool,
    pub rx_keyed: bool,
    pub link_to_link: bool,
    pub dias: bool,
    pub pending: PendingClass,
    pub tot_expired: bool,
    pub tot_notify_played: bool,
    pub tot_unkeyed_since: bool,
    pub dtmf_local_timer_running: bool,
    pub paging: bool,
    pub tx_disabled: bool,
}

/// §4.1 step 4 / §4.5: should the local transmitter be keyed this pass.
pub fn totx(duplex: Duplex, inputs: TotxInputs) -> bool {
    if inputs.tx_disabled {
        return false;
    }

    // TOT gates first: once tripped and notified, stay inhibited until an
    // unkey/re-key cycle resets `tot_unkeyed`.
    if inputs.tot_expired && inputs.tot_notify_played && !inputs.tot_unkeyed_since {
        return false;
    }

    let mut totx = inputs.local_tx || inputs.autopatch_active || inputs.remote_rx;

    if duplex.rx_has_tx_priority() && inputs.rx_keyed && !inputs.link_to_link && !inputs.dias {
        return false;
    }

    let telemetry_wants_tx = matches!(
        inputs.pending,
        PendingClass::Identifier | PendingClass::TailMessage | PendingClass::Courtesy | PendingClass::Other
    );
    if telemetry_wants_tx {
        totx = true;
    }

    if matches!(duplex, Duplex::D2 | Duplex::D3 | Duplex::D4) {
        if inputs.dtmf_local_timer_running || inputs.paging {
            totx = true;
        }
    }

    totx
}
