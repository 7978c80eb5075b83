// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monotonic down-counters driving the node controller's pass loop.
//!
//! Design Notes calls out the source's "timer soup" — dozens of named
//! counters advanced every pass. This aggregates them into one struct
//! with a single `advance` entry point and typed accessors, so §4.1 step
//! 1 is one call and P2 (TOT trip timing) is testable independent of any
//! channel driver.

/// A single down-counter. `None` means "not running".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    remaining_ms: Option<u32>,
    /// Latched true on the pass where `remaining_ms` crosses from >0 to 0.
    fired: bool,
}

impl Timer {
    pub fn running(&self) -> bool {
        self.remaining_ms.is_some()
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms.unwrap_or(0)
    }

    /// Arm the timer for `ms` milliseconds. `0` disarms it immediately
    /// without ever firing (matches the source's "totime=0 disables TOT"
    /// convention carried by several of these timers).
    pub fn start(&mut self, ms: u32) {
        self.fired = false;
        self.remaining_ms = if ms == 0 { None } else { Some(ms) };
    }

    pub fn stop(&mut self) {
        self.remaining_ms = None;
        self.fired = false;
    }

    /// Consume the one-shot "just reached zero" flag.
    pub fn take_fired(&mut self) -> bool {
        std::mem::take(&mut self.fired)
    }

    pub fn advance(&mut self, elapsed_ms: u32) {
        let Some(remaining) = self.remaining_ms else {
            return;
        };
        let next = remaining.saturating_sub(elapsed_ms);
        if next == 0 && remaining > 0 {
            self.fired = true;
        }
        self.remaining_ms = if next == 0 { None } else { Some(next) };
    }
}

/// Every named timer a [`crate::node::Node`] owns (§3 data model).
/// Per-link timers (linger/re-tx/re-rx/new-key) live on `Link` itself
/// since their lifetime is tied to the link, not the node.
#[derive(Debug, Clone, Default)]
pub struct Timers {
    pub hang: Timer,
    pub tot: Timer,
    pub id: Timer,
    pub tail: Timer,
    pub scheduler: Timer,
    pub parrot: Timer,
    pub tail_message: Timer,
    pub link_post: Timer,
    pub key_post: Timer,
    pub dtmf_interdigit: Timer,
    pub local_dtmf: Timer,
    pub macro_: Timer,
    pub vox_timeout: Timer,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every running timer by `elapsed_ms` (§4.1 step 1).
    /// Elapsed time is clamped non-negative by the caller supplying a
    /// `u32`; there is no way to pass negative elapsed time at this API.
    pub fn advance(&mut self, elapsed_ms: u32) {
        self.hang.advance(elapsed_ms);
        self.tot.advance(elapsed_ms);
        self.id.advance(elapsed_ms);
        self.tail.advance(elapsed_ms);
        self.scheduler.advance(elapsed_ms);
        self.parrot.advance(elapsed_ms);
        self.tail_message.advance(elapsed_ms);
        self.link_post.advance(elapsed_ms);
        self.key_post.advance(elapsed_ms);
        self.dtmf_interdigit.advance(elapsed_ms);
        self.local_dtmf.advance(elapsed_ms);
        self.macro_.advance(elapsed_ms);
        self.vox_timeout.advance(elapsed_ms);
    }
}
