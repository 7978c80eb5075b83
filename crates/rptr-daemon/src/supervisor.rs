// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Master supervisor (§5 "The master supervisor has one thread"): spawns
//! one OS thread per configured node worker and restarts it on crash.
//! Each thread owns its `JoinHandle`; this struct owns lifecycle and
//! shutdown signaling, generalized from one thread to N.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rptr_core::config::NodeConfig;
use rptr_core::logging::{self, LogLevel};

/// A node worker crashing more than this many times inside
/// [`RESTART_WINDOW`] is marked unhealthy and not restarted again (§7
/// "Thread restart policy").
pub const MAX_RESTARTS: u32 = 4;
pub const RESTART_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerHealth {
    Running,
    Restarting,
    Unhealthy,
}

/// Tracks a worker's restart history against the `MAX_RESTARTS` /
/// `RESTART_WINDOW` policy without owning the thread itself, so the
/// policy decision is unit-testable with synthetic instants.
#[derive(Debug, Default)]
pub struct RestartLedger {
    restarts: Vec<Instant>,
}

impl RestartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a crash at `now` and report the resulting health.
    pub fn record_crash(&mut self, now: Instant) -> WorkerHealth {
        self.restarts.retain(|t| now.duration_since(*t) < RESTART_WINDOW);
        self.restarts.push(now);
        if self.restarts.len() as u32 > MAX_RESTARTS {
            WorkerHealth::Unhealthy
        } else {
            WorkerHealth::Restarting
        }
    }
}

type NodeBody = dyn Fn(Arc<NodeConfig>, Arc<AtomicBool>) + Send + Sync;

struct WorkerEntry {
    config: Arc<NodeConfig>,
    body: Arc<NodeBody>,
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    ledger: RestartLedger,
    health: WorkerHealth,
}

/// Owns one thread per configured node. Each thread runs the worker body
/// supplied at [`Supervisor::spawn`], which is expected to loop until its
/// shutdown flag is set and otherwise run until it panics or returns.
#[derive(Default)]
pub struct Supervisor {
    workers: HashMap<String, WorkerEntry>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a worker thread for `config`. `body` is the node's entire
    /// worker-thread closure (construct `NodeController`, loop on
    /// `run_once`, exit when the shutdown flag is observed) — stored so
    /// [`Supervisor::reap_and_restart`] can relaunch it without the
    /// caller re-supplying anything.
    pub fn spawn<F>(&mut self, config: Arc<NodeConfig>, body: F)
    where
        F: Fn(Arc<NodeConfig>, Arc<AtomicBool>) + Send + Sync + 'static,
    {
        let name = config.node_name.clone();
        let body: Arc<NodeBody> = Arc::new(body);
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = Self::spawn_thread(&config, shutdown.clone(), &body);
        logging::log(LogLevel::Info, &format!("node {name} worker started"));
        self.workers.insert(
            name,
            WorkerEntry {
                config,
                body,
                handle: Some(handle),
                shutdown,
                ledger: RestartLedger::new(),
                health: WorkerHealth::Running,
            },
        );
    }

    fn spawn_thread(config: &Arc<NodeConfig>, shutdown: Arc<AtomicBool>, body: &Arc<NodeBody>) -> JoinHandle<()> {
        let name = config.node_name.clone();
        let config = config.clone();
        let body = body.clone();
        std::thread::Builder::new()
            .name(format!("rptr-node-{name}"))
            .spawn(move || body(config, shutdown))
            .expect("failed to spawn node worker thread")
    }

    /// Reap any worker thread that has finished (crashed or exited
    /// cleanly) and, unless it's marked unhealthy, restart it in place.
    pub fn reap_and_restart(&mut self, now: Instant) {
        let finished: Vec<String> = self
            .workers
            .iter()
            .filter(|(_, w)| w.handle.as_ref().is_some_and(JoinHandle::is_finished))
            .map(|(name, _)| name.clone())
            .collect();

        for name in finished {
            let Some(entry) = self.workers.get_mut(&name) else { continue };
            entry.handle = None;

            if entry.shutdown.load(Ordering::Relaxed) {
                continue;
            }

            entry.health = entry.ledger.record_crash(now);
            if entry.health == WorkerHealth::Unhealthy {
                log::error!("node {name} exceeded restart budget, leaving it stopped");
                logging::log(LogLevel::Error, &format!("node {name} worker stopped: restart budget exceeded"));
                continue;
            }

            log::warn!("node {name} worker exited unexpectedly, restarting");
            entry.shutdown = Arc::new(AtomicBool::new(false));
            entry.handle = Some(Self::spawn_thread(&entry.config, entry.shutdown.clone(), &entry.body));
        }
    }

    pub fn health(&self, node_name: &str) -> Option<WorkerHealth> {
        self.workers.get(node_name).map(|w| w.health)
    }

    /// Signal every worker to stop and join its thread.
    pub fn shutdown_all(&mut self) {
        for worker in self.workers.values() {
            worker.shutdown.store(true, Ordering::Relaxed);
        }
        for (name, worker) in self.workers.iter_mut() {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
            logging::log(LogLevel::Info, &format!("node {name} worker stopped"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_ledger_allows_up_to_max_restarts_inside_window() {
        let mut ledger = RestartLedger::new();
        let t0 = Instant::now();
        for i in 0..MAX_RESTARTS {
            assert_eq!(ledger.record_crash(t0 + Duration::from_millis(i as u64)), WorkerHealth::Restarting);
        }
        assert_eq!(ledger.record_crash(t0 + Duration::from_millis(10)), WorkerHealth::Unhealthy);
    }

    #[test]
    fn restart_ledger_forgets_crashes_outside_the_window() {
        let mut ledger = RestartLedger::new();
        let t0 = Instant::now();
        for i in 0..MAX_RESTARTS {
            ledger.record_crash(t0 + Duration::from_millis(i as u64));
        }
        let health = ledger.record_crash(t0 + RESTART_WINDOW + Duration::from_secs(1));
        assert_eq!(health, WorkerHealth::Restarting);
    }

    #[test]
    fn spawned_worker_can_be_shut_down_cleanly() {
        let mut supervisor = Supervisor::new();
        let config = Arc::new(NodeConfig { node_name: "546".into(), ..Default::default() });
        supervisor.spawn(config, |_config, shutdown| {
            while !shutdown.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        supervisor.shutdown_all();
        assert!(supervisor.workers.get("546").unwrap().handle.is_none());
    }

    #[test]
    fn crashed_worker_is_restarted_and_reported_running() {
        let mut supervisor = Supervisor::new();
        let config = Arc::new(NodeConfig { node_name: "547".into(), ..Default::default() });
        supervisor.spawn(config, |_config, _shutdown| {
            // Exits immediately, simulating a crash/early-return.
        });

        // Give the thread a moment to actually finish.
        std::thread::sleep(Duration::from_millis(20));
        supervisor.reap_and_restart(Instant::now());

        assert_eq!(supervisor.health("547"), Some(WorkerHealth::Restarting));
        supervisor.shutdown_all();
    }
}
