// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end coverage from an on-disk TOML config through the
//! supervisor to a running, then cleanly-stopped, node worker thread.

use rptr_core::config::NodeConfig;
use rptr_daemon::supervisor::{Supervisor, WorkerHealth, MAX_RESTARTS};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

fn write_config(node_name: &str, functions: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    writeln!(file, "node_name = \"{node_name}\"").unwrap();
    writeln!(file, "duplex = 2").unwrap();
    writeln!(file, "[functions]").unwrap();
    writeln!(file, "{functions}").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn config_loads_and_supervisor_spawns_then_shuts_down_cleanly() {
    let file = write_config("546", "\"*81\" = \"status,1\"\n\"*6\" = \"cop,6\"");
    let config = Arc::new(NodeConfig::from_file(file.path()).expect("valid config"));
    assert_eq!(config.node_name, "546");
    assert_eq!(config.functions.len(), 2);

    let mut sup = Supervisor::new();
    sup.spawn(config, |_config, shutdown| {
        while !shutdown.load(std::sync::atomic::Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(1));
        }
    });

    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(sup.health("546"), Some(WorkerHealth::Running));

    sup.shutdown_all();
}

#[test]
fn rejects_config_with_empty_functions_table() {
    let file = write_config("547", "");
    let err = NodeConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("functions"));
}

#[test]
fn crashed_worker_is_restarted_up_to_the_policy_limit() {
    let file = write_config("548", "\"*81\" = \"status,1\"");
    let config = Arc::new(NodeConfig::from_file(file.path()).expect("valid config"));

    let mut sup = Supervisor::new();
    sup.spawn(config, |_config, _shutdown| {
        // Exits immediately every time, simulating a persistent crash.
    });

    let now = Instant::now();
    for _ in 0..MAX_RESTARTS {
        std::thread::sleep(Duration::from_millis(5));
        sup.reap_and_restart(now);
    }
    std::thread::sleep(Duration::from_millis(5));
    sup.reap_and_restart(now);

    assert_eq!(sup.health("548"), Some(WorkerHealth::Unhealthy));
    sup.shutdown_all();
}
