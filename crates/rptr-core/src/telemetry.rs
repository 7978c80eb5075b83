// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry queue — ordered set of in-flight announcements.
//!
//! Design Notes: the source's telemetry thread is "one giant switch over
//! ~45 modes"; here that becomes a sum type with per-variant payload, and
//! the "MDC1200/PAGE must free their heap block regardless of abort"
//! contract becomes ordinary `Drop` on those payloads instead of a
//! manual free on every exit path.

use std::collections::VecDeque;

/// Every telemetry mode named in §3's data model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryKind {
    Id,
    Id1,
    IdTalkover,
    TailMsg,
    Unkey,
    LinkUnkey,
    RemDisc,
    Connected,
    ConnFail,
    Status(String),
    ArbAlpha,
    Playback(String),
    LocalPlay(String),
    MacroNotFound,
    Timeout,
    TimeoutWarning,
    Proc,
    Term,
    Complete,
    RemAlready,
    RemGo,
    RemMode(String),
    RemLogin,
    RemXxx,
    Scan,
    SetRemote,
    Tune,
    Parrot,
    Meter(String),
    UserOut(String),
    Page(PagePayload),
    Mdc1200(Mdc1200Payload),
    TopKey,
    LastNodeKey,
    LastUser,
    StatsTime { local: bool },
    StatsVersion,
    StatsGps { legacy: bool },
    VarCmd(String),
    PfxTone,
    LocUnkey,
    IdTalk,
    RemComplete,
    RemLongStatus,
    RemShortStatus,
    RevPatch,
    LoginReq,
    UnauthTx,
    ActTimeoutWarning,
    MemNotFound,
    InvFreq,
}

/// Heap-allocated pager payload; dropped unconditionally whether or not
/// playback completes (Design Notes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePayload {
    pub baud: u32,
    pub capcode: String,
    pub text: String,
}

/// Heap-allocated MDC-1200 payload; same drop contract as [`PagePayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mdc1200Payload {
    pub op: u8,
    pub unit_id: u16,
}

/// Classification of what's pending in the queue, consumed by §4.1 step 3
/// to decide whether TX should be keyed this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingClass {
    Identifier,
    TailMessage,
    Courtesy,
    LocalOnly,
    Other,
    None,
}

impl TelemetryKind {
    /// Whether higher-priority activity (user keying) may mark this item
    /// killed before it finishes playing (Invariants §3).
    pub fn killable(&self) -> bool {
        matches!(
            self,
            TelemetryKind::Id | TelemetryKind::Id1 | TelemetryKind::IdTalkover | TelemetryKind::TailMsg
        )
    }

    fn pending_class(&self) -> PendingClass {
        match self {
            TelemetryKind::Id | TelemetryKind::Id1 => PendingClass::Identifier,
            TelemetryKind::TailMsg => PendingClass::TailMessage,
            TelemetryKind::Unkey | TelemetryKind::LinkUnkey | TelemetryKind::LocUnkey => {
                PendingClass::Courtesy
            }
            TelemetryKind::LocalPlay(_) | TelemetryKind::Meter(_) | TelemetryKind::UserOut(_) => {
                PendingClass::LocalOnly
            }
            _ => PendingClass::Other,
        }
    }
}

/// A queued telemetry item (§3 "Telemetry item").
#[derive(Debug, Clone)]
pub struct TelemetryItem {
    pub kind: TelemetryKind,
    pub link_name: Option<String>,
    pub killed: bool,
}

impl TelemetryItem {
    pub fn new(kind: TelemetryKind) -> Self {
        Self {
            kind,
            link_name: None,
            killed: false,
        }
    }

    pub fn for_link(kind: TelemetryKind, link_name: impl Into<String>) -> Self {
        Self {
            kind,
            link_name: Some(link_name.into()),
            killed: false,
        }
    }
}

/// FIFO-by-arrival telemetry queue (Invariants §3).
#[derive(Debug, Clone, Default)]
pub struct TelemetryQueue {
    items: VecDeque<TelemetryItem>,
}

impl TelemetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, item: TelemetryItem) {
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mark every killable item of `kind` as killed; they remain in the
    /// queue until their worker observes the flag and exits (Invariants).
    pub fn kill_matching(&mut self, mut matches_kind: impl FnMut(&TelemetryKind) -> bool) {
        for item in self.items.iter_mut() {
            if item.kind.killable() && matches_kind(&item.kind) {
                item.killed = true;
            }
        }
    }

    /// A worker calls this on completion to remove itself from the queue.
    pub fn remove_completed(&mut self, is_done: impl Fn(&TelemetryItem) -> bool) {
        self.items.retain(|item| !is_done(item));
    }

    /// §4.1 step 3: classify what is pending, highest priority first.
    pub fn classify_pending(&self) -> PendingClass {
        let mut seen_other = false;
        let mut seen_local = false;
        let mut seen_courtesy = false;
        let mut seen_tail = false;
        for item in &self.items {
            if item.killed {
                continue;
            }
            match item.kind.pending_class() {
                PendingClass::Identifier => return PendingClass::Identifier,
                PendingClass::TailMessage => seen_tail = true,
                PendingClass::Courtesy => seen_courtesy = true,
                PendingClass::LocalOnly => seen_local = true,
                PendingClass::Other => seen_other = true,
                PendingClass::None => {}
            }
        }
        if seen_tail {
            PendingClass::TailMessage
        } else if seen_courtesy {
            PendingClass::Courtesy
        } else if seen_other {
            PendingClass::Other
        } else if seen_local {
            PendingClass::LocalOnly
        } else {
            PendingClass::None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryItem> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Id));
        q.enqueue(TelemetryItem::new(TelemetryKind::Complete));
        let order: Vec<_> = q.iter().map(|i| i.kind.clone()).collect();
        assert_eq!(order, vec![TelemetryKind::Id, TelemetryKind::Complete]);
    }

    #[test]
    fn kill_marks_but_does_not_remove() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Id));
        q.kill_matching(|k| matches!(k, TelemetryKind::Id));
        assert_eq!(q.len(), 1);
        assert!(q.iter().next().unwrap().killed);
    }

    #[test]
    fn non_killable_item_is_unaffected_by_kill() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Connected));
        q.kill_matching(|_| true);
        assert!(!q.iter().next().unwrap().killed);
    }

    #[test]
    fn classify_prefers_identifier_over_courtesy() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Unkey));
        q.enqueue(TelemetryItem::new(TelemetryKind::Id));
        assert_eq!(q.classify_pending(), PendingClass::Identifier);
    }

    #[test]
    fn classify_ignores_killed_items() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Id));
        q.kill_matching(|_| true);
        assert_eq!(q.classify_pending(), PendingClass::None);
    }

    #[test]
    fn remove_completed_drops_only_matching() {
        let mut q = TelemetryQueue::new();
        q.enqueue(TelemetryItem::new(TelemetryKind::Id));
        q.enqueue(TelemetryItem::new(TelemetryKind::Complete));
        q.remove_completed(|i| matches!(i.kind, TelemetryKind::Id));
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().next().unwrap().kind, TelemetryKind::Complete);
    }
}
