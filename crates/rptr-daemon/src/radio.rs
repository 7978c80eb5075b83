// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Radio channel stand-in.
//!
//! Rig-specific serial control and GPIO keying are out of scope (spec.md
//! Non-goals): no physical radio exists here for `NodeController` to talk
//! to. `NullRadioChannel` never produces a frame and swallows writes, so
//! the controller loop runs its full pass and every other component
//! stays exercised even though the transmitter itself is a stub a host
//! integration would replace with real hardware I/O.

use rptr_core::channel::{Frame, RadioChannel};

pub struct NullRadioChannel {
    node_name: String,
}

impl NullRadioChannel {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self { node_name: node_name.into() }
    }
}

impl RadioChannel for NullRadioChannel {
    fn try_read(&mut self) -> Option<Frame> {
        None
    }

    fn write(&mut self, frame: Frame) {
        log::trace!("node {}: radio tx (no hardware attached): {frame:?}", self.node_name);
    }

    fn hangup(&mut self) {
        log::debug!("node {}: radio channel hung up", self.node_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_channel_never_yields_a_frame() {
        let mut ch = NullRadioChannel::new("546");
        assert_eq!(ch.try_read(), None);
        ch.write(Frame::Control(rptr_core::channel::ControlCode::Key));
        ch.hangup();
    }
}
