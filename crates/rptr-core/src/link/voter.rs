// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Voter mode: among local RX and co-channel links, mute everyone but
//! the best signal (§4.3 "Voter mode").
//!
//! Design Notes open question: link RSSI only updates on inbound RSSI
//! text frames while local RX's candidate updates every 10th voice
//! frame, so the winner can lag by up to ~200ms. That asymmetry is
//! preserved as-is, not "fixed", per the spec.

/// One candidate source in a vote: either local RX or a named link.
#[derive(Debug, Clone, PartialEq)]
pub struct VoterCandidate {
    pub name: String,
    pub rssi: f32,
}

#[derive(Debug, Default)]
pub struct Voter {
    frame_count: u32,
    current_winner: Option<String>,
    margin_db: f32,
}

impl Voter {
    pub fn new(margin_db: f32) -> Self {
        Self {
            frame_count: 0,
            current_winner: None,
            margin_db,
        }
    }

    pub fn current_winner(&self) -> Option<&str> {
        self.current_winner.as_deref()
    }

    /// Call once per VOICE frame. Recomputes the winner every 10th call
    /// (§4.3); between recomputes the previous winner is kept.
    pub fn tick(&mut self, candidates: &[VoterCandidate]) {
        self.frame_count = self.frame_count.wrapping_add(1);
        if self.frame_count % 10 != 0 {
            return;
        }
        self.recompute(candidates);
    }

    fn recompute(&mut self, candidates: &[VoterCandidate]) {
        let current_rssi = self
            .current_winner
            .as_ref()
            .and_then(|name| candidates.iter().find(|c| &c.name == name))
            .map(|c| c.rssi)
            .unwrap_or(f32::MIN);

        let best = candidates
            .iter()
            .max_by(|a, b| a.rssi.partial_cmp(&b.rssi).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(best) = best {
            if best.rssi > current_rssi + self.margin_db {
                self.current_winner = Some(best.name.clone());
            }
        }
    }

    /// Whether `name`'s audio should pass through unmuted this pass.
    pub fn is_winner(&self, name: &str) -> bool {
        self.current_winner.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(voter: &mut Voter, candidates: &[VoterCandidate], n: u32) {
        for _ in 0..n {
            voter.tick(candidates);
        }
    }

    #[test]
    fn picks_strongest_candidate_exceeding_margin() {
        let mut voter = Voter::new(3.0);
        let candidates = vec![
            VoterCandidate { name: "local".into(), rssi: -80.0 },
            VoterCandidate { name: "1002".into(), rssi: -60.0 },
        ];
        run_ticks(&mut voter, &candidates, 10);
        assert_eq!(voter.current_winner(), Some("1002"));
        assert!(voter.is_winner("1002"));
        assert!(!voter.is_winner("local"));
    }

    #[test]
    fn does_not_switch_winner_within_margin() {
        let mut voter = Voter::new(6.0);
        let candidates = vec![
            VoterCandidate { name: "local".into(), rssi: -60.0 },
            VoterCandidate { name: "1002".into(), rssi: -58.0 },
        ];
        run_ticks(&mut voter, &candidates, 10);
        assert_eq!(voter.current_winner(), Some("local"));
    }

    #[test]
    fn only_recomputes_every_10th_frame() {
        let mut voter = Voter::new(3.0);
        let candidates = vec![VoterCandidate { name: "1002".into(), rssi: -50.0 }];
        for i in 1..10 {
            voter.tick(&candidates);
            assert_eq!(voter.current_winner(), None, "tick {i} should not recompute yet");
        }
        voter.tick(&candidates);
        assert_eq!(voter.current_winner(), Some("1002"));
    }
}
