//! Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] with defaults for the port base, sweep
//! interval, daemon data directory and the RPC credentials handed to every
//! launched node.

use std::path::PathBuf;
use std::time::Duration;

use coinhost_core::constants::{BASE_DAEMON_PORT, COINBASE_MATURITY_HEIGHT, SWEEP_INTERVAL};
use coinhost_core::params::DaemonSpec;

/// Configuration for a [`Supervisor`](crate::Supervisor) and the processes it launches.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Port of the first daemon; later daemons count up from here.
    pub base_port: u16,
    /// Pause between sweeps.
    pub sweep_interval: Duration,
    /// Root under which each daemon gets `<coin>/<network>/<node>`.
    pub data_dir: PathBuf,
    pub rpc_user: String,
    pub rpc_password: String,
    /// On-demand networks are mined up to this height before waiting for
    /// mempool activity.
    pub min_chain_height: u64,
    /// How long a node may take to exit after an RPC `stop` before it is killed.
    pub stop_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coinhost")
            .join("daemons");

        Self {
            base_port: BASE_DAEMON_PORT,
            sweep_interval: SWEEP_INTERVAL,
            data_dir,
            rpc_user: "coinhost".to_string(),
            rpc_password: "coinhost".to_string(),
            min_chain_height: COINBASE_MATURITY_HEIGHT,
            stop_grace: Duration::from_secs(10),
        }
    }
}

impl SupervisorConfig {
    /// Data directory for one daemon.
    pub fn daemon_dir(&self, spec: &DaemonSpec) -> PathBuf {
        self.data_dir
            .join(&spec.coin.id)
            .join(&spec.network.id)
            .join(&spec.node.id)
    }

    /// JSON-RPC endpoint of a daemon, credentials included.
    pub fn rpc_url(&self, spec: &DaemonSpec) -> String {
        format!(
            "http://{}:{}@127.0.0.1:{}",
            self.rpc_user,
            self.rpc_password,
            spec.rpc_port()
        )
    }
}
