//! A single supervised node daemon.
//!
//! [`Daemon`] pairs an immutable [`DaemonSpec`] with the [`NodeProcess`]
//! that controls it and the health the supervisor has observed. State moves
//! `NotStarted → Running → Crashed → Running → … → Stopping → Stopped`;
//! `Stopped` is terminal and only reached through [`Daemon::stop`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use coinhost_core::error::DaemonError;
use coinhost_core::params::DaemonSpec;
use coinhost_core::traits::NodeProcess;

/// Lifecycle state as observed by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    NotStarted,
    Running,
    /// Seen running earlier, found dead (or failed to come back).
    Crashed,
    Stopping,
    Stopped,
}

/// Point-in-time copy of a daemon's identity and health.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    pub coin: String,
    pub node: String,
    pub network: String,
    pub port: u16,
    pub rpc_port: u16,
    pub state: DaemonState,
    pub last_healthy: Option<DateTime<Utc>>,
    /// Successful starts after a crash.
    pub restarts: u32,
    pub blocks_generated: u64,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct Health {
    state: DaemonState,
    last_healthy: Option<DateTime<Utc>>,
    restarts: u32,
    blocks_generated: u64,
    last_error: Option<String>,
}

/// One external node process and what the supervisor knows about it.
///
/// The process handle sits behind an async mutex because start, stop and
/// generation await process and RPC I/O. Health is a plain mutex that is
/// never held across an `.await`.
pub struct Daemon {
    spec: DaemonSpec,
    process: tokio::sync::Mutex<Box<dyn NodeProcess>>,
    health: Mutex<Health>,
}

impl Daemon {
    pub fn new(spec: DaemonSpec, process: Box<dyn NodeProcess>) -> Self {
        Self {
            spec,
            process: tokio::sync::Mutex::new(process),
            health: Mutex::new(Health {
                state: DaemonState::NotStarted,
                last_healthy: None,
                restarts: 0,
                blocks_generated: 0,
                last_error: None,
            }),
        }
    }

    pub fn spec(&self) -> &DaemonSpec {
        &self.spec
    }

    pub fn state(&self) -> DaemonState {
        self.health.lock().state
    }

    pub fn status(&self) -> DaemonStatus {
        let health = self.health.lock();
        DaemonStatus {
            coin: self.spec.coin.id.clone(),
            node: self.spec.node.id.clone(),
            network: self.spec.network.id.clone(),
            port: self.spec.port,
            rpc_port: self.spec.rpc_port(),
            state: health.state,
            last_healthy: health.last_healthy,
            restarts: health.restarts,
            blocks_generated: health.blocks_generated,
            last_error: health.last_error.clone(),
        }
    }

    /// Start the process unless it is already alive.
    ///
    /// A daemon that was running but is now dead is marked crashed and
    /// restarted. Once stopping has begun this is a no-op.
    pub async fn start_if_necessary(&self) -> Result<(), DaemonError> {
        let mut process = self.process.lock().await;

        let state = self.state();
        if matches!(state, DaemonState::Stopping | DaemonState::Stopped) {
            return Ok(());
        }

        if process.is_running() {
            let mut health = self.health.lock();
            health.state = DaemonState::Running;
            health.last_healthy = Some(Utc::now());
            return Ok(());
        }

        if state == DaemonState::Running {
            warn!(daemon = %self.spec.label(), port = self.spec.port, "daemon exited unexpectedly");
            self.health.lock().state = DaemonState::Crashed;
        }

        match process.start().await {
            Ok(()) => {
                let mut health = self.health.lock();
                if health.state == DaemonState::Crashed {
                    health.restarts += 1;
                    warn!(daemon = %self.spec.label(), restarts = health.restarts, "daemon restarted");
                } else {
                    info!(daemon = %self.spec.label(), port = self.spec.port, "daemon started");
                }
                health.state = DaemonState::Running;
                health.last_healthy = Some(Utc::now());
                health.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.health.lock().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Mine blocks on networks that generate on demand, when the process
    /// says something is due. Returns the number of blocks generated.
    pub async fn generate_if_necessary(&self) -> Result<u64, DaemonError> {
        if !self.spec.network.on_demand_blocks {
            return Ok(0);
        }

        let mut process = self.process.lock().await;
        if self.state() != DaemonState::Running {
            return Ok(0);
        }

        match process.generate_block_if_due().await {
            Ok(0) => Ok(0),
            Ok(blocks) => {
                self.health.lock().blocks_generated += blocks;
                debug!(daemon = %self.spec.label(), blocks, "generated blocks");
                Ok(blocks)
            }
            Err(e) => {
                self.health.lock().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Stop the process. The daemon ends up `Stopped` even when the process
    /// reports an error, and is never started again.
    pub async fn stop(&self) -> Result<(), DaemonError> {
        let mut process = self.process.lock().await;
        self.health.lock().state = DaemonState::Stopping;

        let result = process.stop().await;

        let mut health = self.health.lock();
        health.state = DaemonState::Stopped;
        if let Err(e) = &result {
            health.last_error = Some(e.to_string());
        } else {
            info!(daemon = %self.spec.label(), "daemon stopped");
        }
        result
    }
}
