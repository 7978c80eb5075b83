// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repeater controller daemon.
//!
//! Loads one [`rptr_core::config::NodeConfig`] per `--config` path, spawns
//! one supervised worker thread per node (§5 "master supervisor"), and
//! otherwise exposes the CLI verb table (§6) as a one-shot dispatch for
//! a future interactive console or AMI listener to wire into.
//!
//! # Usage
//!
//! ```bash
//! # Run every configured node under the supervisor
//! rptr-daemon run --config node546.toml --config node547.toml
//!
//! # One-shot CLI verb (stub dispatch, see `cli::dispatch`)
//! rptr-daemon show-version
//! ```

use clap::{Parser, Subcommand};
use rptr_core::channel::PeerChannel;
use rptr_core::config::NodeConfig;
use rptr_core::dtmf::{DtmfDispatcher, DtmfSource, FunctionTable};
use rptr_core::link::{Link, LinkMode};
use rptr_core::logging::{self, ConsoleOutput, LogLevel};
use rptr_core::node::{Node, NodeController};
use rptr_daemon::{cli, echolink, radio, supervisor};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rptr-daemon")]
#[command(about = "Repeater/remote-base controller daemon")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one config per `--config` path and run under the supervisor.
    Run {
        #[arg(short, long = "config")]
        configs: Vec<PathBuf>,
    },
    #[command(flatten)]
    Verb(cli::Verb),
}

fn dispatcher_for(config: &NodeConfig) -> DtmfDispatcher {
    let mut tables = HashMap::new();
    tables.insert(DtmfSource::Radio, FunctionTable::from_config_map(&config.functions));
    tables.insert(DtmfSource::Link, FunctionTable::from_config_map(&config.link_functions));
    tables.insert(DtmfSource::Phone, FunctionTable::from_config_map(&config.phone_functions));
    tables.insert(DtmfSource::DumbPhone, FunctionTable::from_config_map(&config.dphone_functions));
    tables.insert(DtmfSource::AltPhone, FunctionTable::from_config_map(&config.alt_functions));
    tables.insert(DtmfSource::Remote, FunctionTable::new());
    tables.insert(DtmfSource::RptInternal, FunctionTable::new());
    DtmfDispatcher::new(tables)
}

/// Current UTC wall clock as `(hour, minute, weekday)`, weekday
/// Monday-first (0=Monday) to match [`rptr_core::scheduler`]'s
/// `DayMask` convention. No timezone conversion: a host deploying away
/// from UTC is expected to run this process with its clock set to the
/// node's local time, same as the original cron-driven scheduler did.
fn wall_clock_now() -> (u8, u8, u8) {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = secs / 86_400;
    let secs_of_day = secs % 86_400;
    // 1970-01-01 was a Thursday (Monday-first index 3).
    let weekday = ((days + 3) % 7) as u8;
    let hour = (secs_of_day / 3600) as u8;
    let minute = ((secs_of_day % 3600) / 60) as u8;
    (hour, minute, weekday)
}

/// One worker-thread body (§4.1's ten-step pass loop, run every 20ms
/// until the supervisor signals shutdown). Rebuilds the node's state
/// from scratch on every call, including on a post-crash restart.
/// `echolink_rx` carries peer sessions admitted by this node's Echolink
/// instance (see [`echolink::echolink_worker`]), attached as link
/// channels as they arrive.
fn node_worker(
    config: Arc<NodeConfig>,
    shutdown: Arc<AtomicBool>,
    echolink_rx: crossbeam_channel::Receiver<(String, Box<dyn PeerChannel>)>,
) {
    let dispatcher = dispatcher_for(&config);
    let node = Node::new(config.clone(), dispatcher);
    let radio = Box::new(radio::NullRadioChannel::new(config.node_name.clone()));
    let mut controller = NodeController::new(node, radio);

    const TICK: Duration = Duration::from_millis(20);
    while !shutdown.load(Ordering::Relaxed) {
        let (hour, minute, weekday) = wall_clock_now();
        controller.set_clock(hour, minute, weekday);

        while let Ok((peer_name, channel)) = echolink_rx.try_recv() {
            if controller.node.links.add(Link::new(&peer_name, LinkMode::Transceive, false)).is_ok() {
                controller.attach_link_channel(peer_name, channel);
            } else {
                log::warn!("node {}: echolink peer {peer_name} already linked, dropping duplicate session", config.node_name);
            }
        }

        if let Err(err) = controller.run_once(TICK.as_millis() as u32, None) {
            log::error!("node {}: controller error: {err}", config.node_name);
            return;
        }
        if controller.is_shut_down() {
            return;
        }
        std::thread::sleep(TICK);
    }
}

fn run(configs: &[PathBuf]) -> anyhow::Result<()> {
    if configs.is_empty() {
        anyhow::bail!("run requires at least one --config path");
    }

    let mut sup = supervisor::Supervisor::new();
    for path in configs {
        let config = match NodeConfig::from_file(path) {
            Ok(config) => Arc::new(config),
            Err(err) => {
                logging::log(LogLevel::Error, &format!("config {} failed to load: {err}", path.display()));
                return Err(err.into());
            }
        };
        log::info!("starting node {}", config.node_name);

        let (echolink_tx, echolink_rx) = crossbeam_channel::unbounded();
        if config.echolink_port.is_some() {
            // Supervisor keys workers by `node_name`; spawn under a
            // synthetic name so this entry doesn't overwrite the node's
            // own worker in its name-keyed map.
            let echolink_config = Arc::new(NodeConfig { node_name: format!("{}-echolink", config.node_name), ..(*config).clone() });
            sup.spawn(echolink_config, move |config, shutdown| {
                echolink::echolink_worker(config, shutdown, echolink_tx.clone())
            });
        }
        sup.spawn(config, move |config, shutdown| node_worker(config, shutdown, echolink_rx.clone()));
    }

    const REAP_INTERVAL: Duration = Duration::from_secs(1);
    loop {
        std::thread::sleep(REAP_INTERVAL);
        sup.reap_and_restart(Instant::now());
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Always-on sink for lifecycle milestones (worker start/stop, config
    // load failures), independent of the env-filter above.
    logging::init_logger(Arc::new(ConsoleOutput::new(LogLevel::Info)), LogLevel::Info);

    match args.command {
        Command::Run { configs } => run(&configs),
        Command::Verb(verb) => {
            println!("{}", cli::dispatch(&verb));
            Ok(())
        }
    }
}
