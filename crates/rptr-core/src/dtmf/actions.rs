// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The twelve DTMF function classes a table entry can name (§4.6),
//! plus the sub-command numbering for the two classes large enough to
//! need one (`cop`, `ilink`), grounded in `rpt_functions.c`'s dispatch
//! table.
//!
//! Each class also owns a [`DtmfAction`] handler: the side effect a
//! matched function-table entry actually has on the node, dispatched by
//! [`dispatch_action`] once the digit buffer completes a command.

/// One function-table action. The node controller owns the handler for
/// each variant; this module only names the shape of the dispatch, not
/// the side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Control-operator functions, numbered sub-commands (`cop,N`).
    Cop,
    AutopatchUp,
    AutopatchDown,
    /// Inter-node link control, numbered sub-commands (`ilink,N`).
    Ilink,
    Status,
    Remote,
    Macro,
    Playback,
    LocalPlay,
    Meter,
    UserOut,
    Cmd,
}

impl Action {
    /// Parse the config-file action name (the part before the comma in a
    /// `functions` entry).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "cop" => Self::Cop,
            "autopatchup" => Self::AutopatchUp,
            "autopatchdn" | "autopatchdown" => Self::AutopatchDown,
            "ilink" => Self::Ilink,
            "status" => Self::Status,
            "remote" => Self::Remote,
            "macro" => Self::Macro,
            "playback" => Self::Playback,
            "localplay" => Self::LocalPlay,
            "meter" => Self::Meter,
            "userout" => Self::UserOut,
            "cmd" => Self::Cmd,
            _ => return None,
        })
    }
}

/// `cop` sub-commands (§4.6), numbered as in the source's `cop_tab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopSubcommand {
    /// 1: toggle CTCSS on link output.
    ToggleCtcss = 1,
    /// 2: toggle repeater enable/disable.
    ToggleEnable = 2,
    /// 3: toggle autopatch enable.
    ToggleAutopatch = 3,
    /// 4: toggle link-to-link audio.
    ToggleLinkToLink = 4,
    /// 5: reset repeater timers.
    ResetTimers = 5,
    /// 6: enter scheduled-macro test mode.
    MacroTest = 6,
    /// 10: force ID now.
    ForceId = 10,
    /// 11: enable/disable parrot mode.
    ToggleParrot = 11,
}

impl CopSubcommand {
    pub fn from_param(param: &str) -> Option<Self> {
        Some(match param.parse::<u32>().ok()? {
            1 => Self::ToggleCtcss,
            2 => Self::ToggleEnable,
            3 => Self::ToggleAutopatch,
            4 => Self::ToggleLinkToLink,
            5 => Self::ResetTimers,
            6 => Self::MacroTest,
            10 => Self::ForceId,
            11 => Self::ToggleParrot,
            _ => return None,
        })
    }
}

/// `ilink` sub-commands (§4.6 Scenario 3: disconnect-all / reconnect-last
/// are `ilink,6` and `ilink,16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlinkMode {
    /// 1: connect to the node named in the trailing digits, transceive.
    ConnectTransceive = 1,
    /// 2: connect to the node named in the trailing digits, monitor only.
    ConnectMonitor = 2,
    /// 3: disconnect the node named in the trailing digits.
    DisconnectOne = 3,
    /// 6: disconnect every connected link.
    DisconnectAll = 6,
    /// 7: announce the currently connected link set.
    AnnounceLinks = 7,
    /// 11: connect transceive, local-only (not propagated).
    ConnectLocalOnly = 11,
    /// 16: reconnect the most recently disconnected link.
    ReconnectLast = 16,
}

impl IlinkMode {
    pub fn from_param(param: &str) -> Option<(Self, &str)> {
        let mut chars = param.chars();
        let code: String = chars.by_ref().take_while(|c| c.is_ascii_digit()).collect();
        let rest = chars.as_str();
        let mode = match code.parse::<u32>().ok()? {
            1 => Self::ConnectTransceive,
            2 => Self::ConnectMonitor,
            3 => Self::DisconnectOne,
            6 => Self::DisconnectAll,
            7 => Self::AnnounceLinks,
            11 => Self::ConnectLocalOnly,
            16 => Self::ReconnectLast,
            _ => return None,
        };
        Some((mode, rest))
    }
}

use crate::link::{Link, LinkMode};
use crate::node::{Node, ParrotMode, SysStateFlags};
use crate::telemetry::{TelemetryItem, TelemetryKind};

/// One function class's side effect on the node (§4.6). Split out of
/// [`Action`] itself so each class's handler is independently testable
/// and `dispatch_action` stays a flat match instead of a growing `impl`.
pub trait DtmfAction {
    fn execute(&self, node: &mut Node, param: &str);
}

fn toggle(node: &mut Node, flip: impl FnOnce(&mut SysStateFlags)) {
    let idx = node.sys_state.current_index();
    let mut flags = *node.sys_state.current();
    flip(&mut flags);
    node.sys_state.set(idx, flags);
}

pub struct CopAction;
impl DtmfAction for CopAction {
    fn execute(&self, node: &mut Node, param: &str) {
        let Some(sub) = CopSubcommand::from_param(param) else {
            node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::MacroNotFound));
            return;
        };
        match sub {
            CopSubcommand::ToggleCtcss => {
                node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Proc));
            }
            CopSubcommand::ToggleEnable => toggle(node, |f| f.tx_disable = !f.tx_disable),
            CopSubcommand::ToggleAutopatch => toggle(node, |f| f.autopatch_disable = !f.autopatch_disable),
            CopSubcommand::ToggleLinkToLink => toggle(node, |f| f.link_disable = !f.link_disable),
            CopSubcommand::ResetTimers => {
                node.tot.timer.stop();
                node.id.timer.stop();
                node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Proc));
            }
            CopSubcommand::MacroTest => {
                node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Proc));
            }
            CopSubcommand::ForceId => {
                node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Id));
                node.id.on_id_played();
            }
            CopSubcommand::ToggleParrot => {
                node.parrot.mode = match node.parrot.mode {
                    Some(ParrotMode::Disabled) | None => Some(ParrotMode::Once),
                    Some(_) => Some(ParrotMode::Disabled),
                };
            }
        }
    }
}

pub struct IlinkAction;
impl DtmfAction for IlinkAction {
    fn execute(&self, node: &mut Node, param: &str) {
        let Some((mode, rest)) = IlinkMode::from_param(param) else {
            node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::MacroNotFound));
            return;
        };
        match mode {
            IlinkMode::ConnectTransceive | IlinkMode::ConnectLocalOnly => {
                connect_peer(node, rest, LinkMode::Transceive);
            }
            IlinkMode::ConnectMonitor => {
                connect_peer(node, rest, LinkMode::RxOnly);
            }
            IlinkMode::DisconnectOne => {
                if node.links.remove(rest).is_some() {
                    node.savednodes.push(rest.to_string());
                }
            }
            IlinkMode::DisconnectAll => {
                for link in node.links.drain() {
                    if !link.perma {
                        node.savednodes.push(link.peer_name);
                    }
                }
            }
            IlinkMode::AnnounceLinks => {
                let names: Vec<&str> = node.links.iter().map(|l| l.peer_name.as_str()).collect();
                node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Status(names.join(","))));
            }
            IlinkMode::ReconnectLast => {
                if let Some(peer) = node.savednodes.pop() {
                    connect_peer(node, &peer, LinkMode::Transceive);
                }
            }
        }
    }
}

fn connect_peer(node: &mut Node, peer_name: &str, mode: LinkMode) {
    if peer_name.is_empty() || node.links.contains(peer_name) {
        return;
    }
    let _ = node.links.add(Link::new(peer_name, mode, true));
}

pub struct AutopatchUpAction;
impl DtmfAction for AutopatchUpAction {
    fn execute(&self, node: &mut Node, _param: &str) {
        node.autopatch_active = true;
    }
}

pub struct AutopatchDownAction;
impl DtmfAction for AutopatchDownAction {
    fn execute(&self, node: &mut Node, _param: &str) {
        node.autopatch_active = false;
    }
}

pub struct StatusAction;
impl DtmfAction for StatusAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Status(param.to_string())));
    }
}

pub struct RemoteAction;
impl DtmfAction for RemoteAction {
    fn execute(&self, node: &mut Node, _param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::RemGo));
    }
}

pub struct MacroAction;
impl DtmfAction for MacroAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.enqueue_macro(param);
    }
}

pub struct PlaybackAction;
impl DtmfAction for PlaybackAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Playback(param.to_string())));
    }
}

pub struct LocalPlayAction;
impl DtmfAction for LocalPlayAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::LocalPlay(param.to_string())));
    }
}

pub struct MeterAction;
impl DtmfAction for MeterAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::Meter(param.to_string())));
    }
}

pub struct UserOutAction;
impl DtmfAction for UserOutAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::UserOut(param.to_string())));
    }
}

pub struct CmdAction;
impl DtmfAction for CmdAction {
    fn execute(&self, node: &mut Node, param: &str) {
        node.telemetry.enqueue(TelemetryItem::new(TelemetryKind::VarCmd(param.to_string())));
    }
}

/// Run the handler for a matched function-table entry's action (§4.6).
pub fn dispatch_action(action: Action, node: &mut Node, param: &str) {
    match action {
        Action::Cop => CopAction.execute(node, param),
        Action::AutopatchUp => AutopatchUpAction.execute(node, param),
        Action::AutopatchDown => AutopatchDownAction.execute(node, param),
        Action::Ilink => IlinkAction.execute(node, param),
        Action::Status => StatusAction.execute(node, param),
        Action::Remote => RemoteAction.execute(node, param),
        Action::Macro => MacroAction.execute(node, param),
        Action::Playback => PlaybackAction.execute(node, param),
        Action::LocalPlay => LocalPlayAction.execute(node, param),
        Action::Meter => MeterAction.execute(node, param),
        Action::UserOut => UserOutAction.execute(node, param),
        Action::Cmd => CmdAction.execute(node, param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_parses_known_action_words() {
        assert_eq!(Action::from_name("ilink"), Some(Action::Ilink));
        assert_eq!(Action::from_name("cop"), Some(Action::Cop));
        assert_eq!(Action::from_name("bogus"), None);
    }

    #[test]
    fn cop_parses_known_subcommands() {
        assert_eq!(CopSubcommand::from_param("11"), Some(CopSubcommand::ToggleParrot));
        assert_eq!(CopSubcommand::from_param("99"), None);
    }

    #[test]
    fn ilink_disconnect_all_is_scenario_3_code() {
        let (mode, rest) = IlinkMode::from_param("6").unwrap();
        assert_eq!(mode, IlinkMode::DisconnectAll);
        assert_eq!(rest, "");
    }

    #[test]
    fn ilink_reconnect_last_is_scenario_3_code() {
        let (mode, rest) = IlinkMode::from_param("16").unwrap();
        assert_eq!(mode, IlinkMode::ReconnectLast);
        assert_eq!(rest, "");
    }

    #[test]
    fn ilink_connect_splits_code_from_trailing_node_number() {
        let (mode, rest) = IlinkMode::from_param("11001").unwrap();
        assert_eq!(mode, IlinkMode::ConnectTransceive);
        assert_eq!(rest, "1001");
    }
}
