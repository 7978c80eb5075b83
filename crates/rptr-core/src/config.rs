// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-node configuration.
//!
//! Spec §6 enumerates the recognized config keys; loading the original
//! ini-style config file format is out of scope (spec.md Non-goals), so
//! this struct is the contract and TOML is the on-disk representation a
//! host application is expected to produce. Every field is optional
//! unless the spec says otherwise (`functions`, `call`/`pwd` for the
//! Echolink instance config live in `rptr-echolink`).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_duplex() -> u8 {
    2
}
fn default_totime_ms() -> u32 {
    180_000
}
fn default_hangtime_ms() -> u32 {
    1000
}
fn default_dtmf_timeout_ms() -> u32 {
    3000
}
fn default_max_dtmf() -> usize {
    32
}

/// One radio node's configuration snapshot (§3 "Node", §6 "Config keys").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Numeric node name, used as the network identity.
    pub node_name: String,

    pub context: Option<String>,
    pub callerid: Option<String>,
    pub accountcode: Option<String>,
    pub idrecording: Option<String>,

    #[serde(default = "default_hangtime_ms")]
    pub hangtime_ms: u32,
    pub althangtime_ms: Option<u32>,
    #[serde(default = "default_totime_ms")]
    pub totime_ms: u32,
    pub time_out_reset_unkey_interval_ms: Option<u32>,
    pub time_out_reset_kerchunk_interval_ms: Option<u32>,

    pub voxtimeout_ms: Option<u32>,
    pub voxrecover_ms: Option<u32>,
    pub simplexpatchdelay_ms: Option<u32>,
    pub simplexphonedelay_ms: Option<u32>,

    pub statpost_program: Option<String>,
    pub statpost_url: Option<String>,

    pub tailmessagetime_ms: Option<u32>,
    pub tailsquashedtime_ms: Option<u32>,

    /// Repeat mode 0..4, see §4.5.
    #[serde(default = "default_duplex")]
    pub duplex: u8,

    pub idtime_ms: Option<u32>,
    pub politeid_ms: Option<u32>,
    pub elke: Option<bool>,
    pub tonezone: Option<String>,
    #[serde(default)]
    pub tailmessagelist: Vec<String>,
    pub memory: Option<String>,
    pub morse: Option<String>,
    pub telemetry: Option<String>,
    #[serde(default)]
    pub r#macro: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub tonemacro: std::collections::HashMap<String, String>,
    pub mdcmacro: Option<String>,
    pub startup_macro: Option<String>,

    pub iobase: Option<u16>,
    pub ioport: Option<String>,

    /// Required unless a "simple" function shorthand is used.
    #[serde(default)]
    pub functions: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub link_functions: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub phone_functions: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub dphone_functions: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub alt_functions: std::collections::HashMap<String, String>,
    pub funcchar: Option<char>,
    pub endchar: Option<char>,

    pub nobusyout: Option<bool>,
    pub notelemtx: Option<bool>,
    pub propagate_dtmf: Option<bool>,
    pub propagate_phonedtmf: Option<bool>,
    pub linktolink: Option<bool>,

    #[serde(default)]
    pub nodes: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub extnodes: std::collections::HashMap<String, String>,
    pub extnodefile: Option<String>,
    #[serde(default)]
    pub locallinknodes: Vec<String>,
    pub lconn: Option<String>,
    pub ldisc: Option<String>,
    pub patchconnect: Option<String>,

    pub archivedir: Option<String>,
    pub archiveaudio: Option<bool>,
    pub archivedatefmt: Option<String>,
    pub archiveformat: Option<String>,

    pub authlevel: Option<u8>,
    pub parrot: Option<String>,
    pub parrottime_ms: Option<u32>,
    pub rptnode: Option<bool>,
    pub mars: Option<bool>,
    pub monminblocks: Option<u32>,

    pub remote_inact_timeout_s: Option<u32>,
    pub civaddr: Option<u8>,
    pub remote_timeout_s: Option<u32>,
    pub remote_timeout_warning_s: Option<u32>,
    pub remote_timeout_warning_freq_s: Option<u32>,

    pub erxgain_db: Option<f32>,
    pub etxgain_db: Option<f32>,
    /// 1..3
    pub eannmode: Option<u8>,
    pub trxgain_db: Option<f32>,
    pub ttxgain_db: Option<f32>,
    /// 1..3
    pub tannmode: Option<u8>,
    pub linkmongain_db: Option<f32>,

    pub connpgm: Option<String>,
    pub discpgm: Option<String>,

    pub mdclog: Option<bool>,
    pub lnkactenable: Option<bool>,
    pub lnkacttimerwarn_s: Option<u32>,
    pub lnkacttime_s: Option<u32>,
    pub lnkactmacro: Option<String>,
    pub nolocallinkct: Option<bool>,
    pub rptinacttime_s: Option<u32>,
    pub rptinactmacro: Option<String>,
    pub nounkeyct: Option<bool>,
    pub holdofftelem: Option<bool>,
    pub beaconing: Option<bool>,

    pub rxburstfreq_hz: Option<u32>,
    pub rxbursttime_ms: Option<u32>,
    pub rxburstthreshold: Option<f32>,

    pub litztime_ms: Option<u32>,
    pub litzchar: Option<String>,
    pub litzcmd: Option<String>,

    pub itxctcss: Option<bool>,
    pub gpsfeet: Option<bool>,
    pub split2m_hz: Option<u32>,
    pub split70cm_hz: Option<u32>,

    pub dtmfkey: Option<String>,
    #[serde(default)]
    pub dtmfkeys: Vec<String>,

    pub outstreamcmd: Option<String>,
    pub eloutbound: Option<String>,
    #[serde(default)]
    pub events: std::collections::HashMap<String, String>,
    pub timezone: Option<String>,
    pub rxnotch: Option<bool>,

    /// 1 enables single-winner co-channel voting, see §4.3.
    pub votertype: Option<u8>,
    pub votermode: Option<u8>,
    pub votermargin_db: Option<f32>,

    pub telemnomdb: Option<f32>,
    pub telemduckdb: Option<f32>,
    /// 1..3
    pub telemdefault: Option<u8>,
    pub telemdynamic: Option<bool>,
    pub guilinkdefault: Option<bool>,
    pub guilinkdynamic: Option<bool>,
    pub phonelinkdefault: Option<bool>,
    pub phonelinkdynamic: Option<bool>,
    pub echolinkdefault: Option<bool>,
    pub echolinkdynamic: Option<bool>,
    /// Local IP the Echolink audio/control socket pair binds to.
    pub echolink_bind_ip: Option<String>,
    /// Audio socket port; control binds to this plus one (§4.4).
    pub echolink_port: Option<u16>,
    pub echolink_callsign: Option<String>,
    pub tlbdefault: Option<bool>,
    pub tlbdynamic: Option<bool>,

    #[serde(default)]
    pub locallist: Vec<String>,
    pub ctgroup: Option<String>,
    #[serde(default)]
    pub inxlat: std::collections::HashMap<char, char>,
    #[serde(default)]
    pub outxlat: std::collections::HashMap<char, char>,

    pub sleeptime_s: Option<u32>,
    #[serde(default)]
    pub controlstates: std::collections::HashMap<u8, String>,
    pub scheduler: Option<String>,
    pub txlimits: Option<String>,
    pub dias: Option<bool>,
    pub dusbabek: Option<bool>,
    pub iospeed: Option<u32>,

    #[serde(default = "default_dtmf_timeout_ms")]
    pub dtmf_timeout_ms: u32,
    #[serde(default = "default_max_dtmf")]
    pub max_dtmf: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            context: None,
            callerid: None,
            accountcode: None,
            idrecording: None,
            hangtime_ms: default_hangtime_ms(),
            althangtime_ms: None,
            totime_ms: default_totime_ms(),
            time_out_reset_unkey_interval_ms: None,
            time_out_reset_kerchunk_interval_ms: None,
            voxtimeout_ms: None,
            voxrecover_ms: None,
            simplexpatchdelay_ms: None,
            simplexphonedelay_ms: None,
            statpost_program: None,
            statpost_url: None,
            tailmessagetime_ms: None,
            tailsquashedtime_ms: None,
            duplex: default_duplex(),
            idtime_ms: None,
            politeid_ms: None,
            elke: None,
            tonezone: None,
            tailmessagelist: Vec::new(),
            memory: None,
            morse: None,
            telemetry: None,
            r#macro: Default::default(),
            tonemacro: Default::default(),
            mdcmacro: None,
            startup_macro: None,
            iobase: None,
            ioport: None,
            functions: Default::default(),
            link_functions: Default::default(),
            phone_functions: Default::default(),
            dphone_functions: Default::default(),
            alt_functions: Default::default(),
            funcchar: None,
            endchar: None,
            nobusyout: None,
            notelemtx: None,
            propagate_dtmf: None,
            propagate_phonedtmf: None,
            linktolink: None,
            nodes: Default::default(),
            extnodes: Default::default(),
            extnodefile: None,
            locallinknodes: Vec::new(),
            lconn: None,
            ldisc: None,
            patchconnect: None,
            archivedir: None,
            archiveaudio: None,
            archivedatefmt: None,
            archiveformat: None,
            authlevel: None,
            parrot: None,
            parrottime_ms: None,
            rptnode: None,
            mars: None,
            monminblocks: None,
            remote_inact_timeout_s: None,
            civaddr: None,
            remote_timeout_s: None,
            remote_timeout_warning_s: None,
            remote_timeout_warning_freq_s: None,
            erxgain_db: None,
            etxgain_db: None,
            eannmode: None,
            trxgain_db: None,
            ttxgain_db: None,
            tannmode: None,
            linkmongain_db: None,
            connpgm: None,
            discpgm: None,
            mdclog: None,
            lnkactenable: None,
            lnkacttimerwarn_s: None,
            lnkacttime_s: None,
            lnkactmacro: None,
            nolocallinkct: None,
            rptinacttime_s: None,
            rptinactmacro: None,
            nounkeyct: None,
            holdofftelem: None,
            beaconing: None,
            rxburstfreq_hz: None,
            rxbursttime_ms: None,
            rxburstthreshold: None,
            litztime_ms: None,
            litzchar: None,
            litzcmd: None,
            itxctcss: None,
            gpsfeet: None,
            split2m_hz: None,
            split70cm_hz: None,
            dtmfkey: None,
            dtmfkeys: Vec::new(),
            outstreamcmd: None,
            eloutbound: None,
            events: Default::default(),
            timezone: None,
            rxnotch: None,
            votertype: None,
            votermode: None,
            votermargin_db: None,
            telemnomdb: None,
            telemduckdb: None,
            telemdefault: None,
            telemdynamic: None,
            guilinkdefault: None,
            guilinkdynamic: None,
            phonelinkdefault: None,
            phonelinkdynamic: None,
            echolinkdefault: None,
            echolinkdynamic: None,
            echolink_bind_ip: None,
            echolink_port: None,
            echolink_callsign: None,
            tlbdefault: None,
            tlbdynamic: None,
            locallist: Vec::new(),
            ctgroup: None,
            inxlat: Default::default(),
            outxlat: Default::default(),
            sleeptime_s: None,
            controlstates: Default::default(),
            scheduler: None,
            txlimits: None,
            dias: None,
            dusbabek: None,
            iospeed: None,
            dtmf_timeout_ms: default_dtmf_timeout_ms(),
            max_dtmf: default_max_dtmf(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file; `node_name` must be present and non-empty.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::Invalid("node_name is required".into()));
        }
        if !self.node_name.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid(
                "node_name must be a numeric string".into(),
            ));
        }
        if self.duplex > 4 {
            return Err(ConfigError::Invalid(format!(
                "duplex must be 0..4, got {}",
                self.duplex
            )));
        }
        if self.functions.is_empty() {
            return Err(ConfigError::Invalid(
                "functions table is required (no \"simple\" shorthand supported)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        node_name = "546"
        duplex = 2

        [functions]
        "*81" = "status,1"
        "#
    }

    #[test]
    fn parses_minimal_config() {
        let cfg: NodeConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(cfg.node_name, "546");
        assert_eq!(cfg.duplex, 2);
        assert_eq!(cfg.hangtime_ms, default_hangtime_ms());
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_non_numeric_node_name() {
        let mut cfg = NodeConfig {
            node_name: "rpt1".into(),
            ..Default::default()
        };
        cfg.functions.insert("*81".into(), "status,1".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_duplex() {
        let mut cfg = NodeConfig {
            node_name: "546".into(),
            duplex: 9,
            ..Default::default()
        };
        cfg.functions.insert("*81".into(), "status,1".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_missing_functions_table() {
        let cfg = NodeConfig {
            node_name: "546".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
