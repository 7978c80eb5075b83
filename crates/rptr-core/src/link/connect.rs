// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound connect / reconnect / disconnect state machine (§4.3).

use std::time::Duration;

/// Node-name resolution step, tried in the configured order (§4.3
/// "Outbound connect sequence"): DNS SRV+A, DNS TXT, local/extern file.
/// Grounded in `rpt_link.c`'s node-lookup fallback chain.
pub trait NodeLookup {
    fn resolve(&self, peer_name: &str) -> Option<String>;
}

/// Tries each configured lookup in order, returning the first hit.
pub struct Resolver {
    lookups: Vec<Box<dyn NodeLookup + Send>>,
}

impl Resolver {
    pub fn new(lookups: Vec<Box<dyn NodeLookup + Send>>) -> Self {
        Self { lookups }
    }

    pub fn resolve(&self, peer_name: &str) -> Option<String> {
        self.lookups.iter().find_map(|l| l.resolve(peer_name))
    }
}

pub const RETRY_TIMER_MS: u32 = 5_000;
/// A full repeater peer gets the longer grace window; remote/ephemeral
/// peers disconnect immediately (§4.3 "Disconnect").
pub const DISC_TIME_FULL_MS: u32 = 10_000;
pub const DISC_TIME_IMMEDIATE_MS: u32 = 1;
pub const LOCAL_DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// Connection attempt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Dialing,
    Ringing,
    Connected,
    RetryScheduled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { first_time: bool },
    RetryScheduled { attempt: u32 },
    GaveUp,
}

/// Drives one peer's outbound connect attempt through retry/backoff.
/// `had_ever_connected` gates whether a reconnect re-announces CONNECTED
/// telemetry (§4.3 "Reconnect": announce only the first time).
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    pub retries: u32,
    pub max_retries: u32,
    pub had_ever_connected: bool,
}

impl ConnectAttempt {
    pub fn new(max_retries: u32) -> Self {
        Self {
            retries: 0,
            max_retries,
            had_ever_connected: false,
        }
    }

    pub fn on_answer(&mut self) -> ConnectOutcome {
        let first_time = !self.had_ever_connected;
        self.had_ever_connected = true;
        self.retries = 0;
        ConnectOutcome::Connected { first_time }
    }

    /// Failure or hangup before ANSWER.
    pub fn on_failure(&mut self) -> ConnectOutcome {
        self.retries += 1;
        if self.retries < self.max_retries {
            ConnectOutcome::RetryScheduled { attempt: self.retries }
        } else {
            ConnectOutcome::GaveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup(Option<&'static str>);
    impl NodeLookup for FixedLookup {
        fn resolve(&self, _peer_name: &str) -> Option<String> {
            self.0.map(|s| s.to_string())
        }
    }

    #[test]
    fn resolver_tries_in_order_and_stops_at_first_hit() {
        let resolver = Resolver::new(vec![
            Box::new(FixedLookup(None)),
            Box::new(FixedLookup(Some("203.0.113.5:5038"))),
            Box::new(FixedLookup(Some("unused"))),
        ]);
        assert_eq!(
            resolver.resolve("1001"),
            Some("203.0.113.5:5038".to_string())
        );
    }

    #[test]
    fn resolver_returns_none_if_all_lookups_miss() {
        let resolver = Resolver::new(vec![Box::new(FixedLookup(None))]);
        assert_eq!(resolver.resolve("1001"), None);
    }

    #[test]
    fn reconnect_does_not_reannounce_connected_after_first_success() {
        let mut attempt = ConnectAttempt::new(3);
        assert_eq!(attempt.on_answer(), ConnectOutcome::Connected { first_time: true });
        // Failure then a later reconnect:
        attempt.on_failure();
        assert_eq!(attempt.on_answer(), ConnectOutcome::Connected { first_time: false });
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut attempt = ConnectAttempt::new(2);
        assert_eq!(attempt.on_failure(), ConnectOutcome::RetryScheduled { attempt: 1 });
        assert_eq!(attempt.on_failure(), ConnectOutcome::GaveUp);
    }
}
