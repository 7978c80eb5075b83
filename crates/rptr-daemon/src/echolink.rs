// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Echolink instance worker thread: one of a node's supervised threads
//! (§5), spawned alongside the node's own worker under a distinct
//! supervisor key so the two don't collide in `Supervisor`'s name-keyed
//! worker map.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use rptr_core::channel::PeerChannel;
use rptr_core::config::NodeConfig;
use rptr_echolink::driver::EcholinkDriver;

/// Bind and run an Echolink instance for `config` until `shutdown` is
/// set, forwarding each admitted peer session to `new_session_tx` for
/// the node worker thread to attach as a link channel.
pub fn echolink_worker(
    config: Arc<NodeConfig>,
    shutdown: Arc<AtomicBool>,
    new_session_tx: Sender<(String, Box<dyn PeerChannel>)>,
) {
    let bind_ip = config
        .echolink_bind_ip
        .as_deref()
        .and_then(|s| s.parse::<Ipv4Addr>().ok())
        .unwrap_or(Ipv4Addr::UNSPECIFIED);
    let port = match config.echolink_port {
        Some(port) => port,
        None => return,
    };
    let callsign = match &config.echolink_callsign {
        Some(callsign) => callsign.clone(),
        None => return,
    };

    let mut driver = match EcholinkDriver::new(bind_ip, port, callsign.clone(), &config.node_name, Vec::new(), Vec::new()) {
        Ok(driver) => driver,
        Err(err) => {
            log::error!("node {}: echolink bind failed on {bind_ip}:{port}: {err}", config.node_name);
            return;
        }
    };

    log::info!("node {}: echolink instance {callsign} listening on {bind_ip}:{port}", config.node_name);
    driver.run(|| shutdown.load(Ordering::Relaxed), &new_session_tx);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_immediately_without_port_or_callsign() {
        let config = Arc::new(NodeConfig { node_name: "546".into(), ..Default::default() });
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = crossbeam_channel::unbounded();
        echolink_worker(config, shutdown, tx);
    }
}
