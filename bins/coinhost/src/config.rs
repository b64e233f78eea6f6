//! Service configuration.
//!
//! Loaded with the `config` crate from an optional TOML file, then
//! `COINHOST__*` environment variables (`COINHOST__BIND`,
//! `COINHOST__SUPERVISOR__BASE_PORT`, ...), then CLI flags.
//!
//! ```toml
//! bind = "127.0.0.1:27888"
//! network = "regtest"
//! wallet_rpc = "http://127.0.0.1:27889"
//!
//! [supervisor]
//! base_port = 56200
//!
//! [[daemons]]
//! coin = "vtc"
//! node = "vertcoind"
//! network = "regtest"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

use coinhost_core::constants::{
    BASE_DAEMON_PORT, COINBASE_MATURITY_HEIGHT, DEFAULT_JOURNAL_CAPACITY, SWEEP_INTERVAL,
};
use coinhost_core::params::{Coin, CoinNetwork, CoinNode};
use coinhost_daemon::SupervisorConfig;

/// Top-level service configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub bind: String,
    /// Allow cross-origin requests to the API.
    pub cors: bool,
    /// Coin the wallet transfers.
    pub coin: String,
    /// Network whose address prefixes transfers are validated against.
    pub network: String,
    /// JSON-RPC endpoint of the wallet engine.
    pub wallet_rpc: String,
    /// Maximum number of failed broadcasts kept for recovery.
    pub journal_capacity: usize,
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    pub supervisor: SupervisorSection,
    /// Node kinds in addition to the builtin ones; same id overrides.
    pub nodes: Vec<CoinNode>,
    /// Networks in addition to the builtin ones; same id overrides.
    pub networks: Vec<CoinNetwork>,
    /// Daemons to supervise. Empty means one `vertcoind` for the active
    /// coin and network.
    pub daemons: Vec<DaemonEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SupervisorSection {
    pub base_port: u16,
    pub sweep_interval_secs: u64,
    /// Defaults to `<data dir>/coinhost/daemons`.
    pub data_dir: Option<PathBuf>,
    pub rpc_user: String,
    pub rpc_password: String,
    pub min_chain_height: u64,
    pub stop_grace_secs: u64,
}

/// One supervised daemon, by ids.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DaemonEntry {
    pub coin: String,
    pub node: String,
    pub network: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:27888".to_string(),
            cors: false,
            coin: "vtc".to_string(),
            network: "mainnet".to_string(),
            wallet_rpc: "http://127.0.0.1:27889".to_string(),
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            supervisor: SupervisorSection::default(),
            nodes: Vec::new(),
            networks: Vec::new(),
            daemons: Vec::new(),
        }
    }
}

impl Default for SupervisorSection {
    fn default() -> Self {
        let defaults = SupervisorConfig::default();
        Self {
            base_port: BASE_DAEMON_PORT,
            sweep_interval_secs: SWEEP_INTERVAL.as_secs(),
            data_dir: None,
            rpc_user: defaults.rpc_user,
            rpc_password: defaults.rpc_password,
            min_chain_height: COINBASE_MATURITY_HEIGHT,
            stop_grace_secs: defaults.stop_grace.as_secs(),
        }
    }
}

impl SupervisorSection {
    pub fn to_supervisor_config(&self) -> SupervisorConfig {
        let defaults = SupervisorConfig::default();
        SupervisorConfig {
            base_port: self.base_port,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            data_dir: self.data_dir.clone().unwrap_or(defaults.data_dir),
            rpc_user: self.rpc_user.clone(),
            rpc_password: self.rpc_password.clone(),
            min_chain_height: self.min_chain_height,
            stop_grace: Duration::from_secs(self.stop_grace_secs),
        }
    }
}

fn builder(path: Option<&Path>, env: Environment) -> ConfigBuilder<DefaultState> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name("coinhost").required(false),
    };
    config::Config::builder().add_source(file).add_source(env)
}

fn environment() -> Environment {
    Environment::with_prefix("COINHOST")
        .separator("__")
        .try_parsing(true)
}

impl Config {
    /// Load from `path` (or `./coinhost.toml` if present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let source = path.map_or_else(|| "coinhost.toml".to_string(), |p| p.display().to_string());
        builder(path, env)
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| format!("failed to load configuration from {source}"))
    }

    pub fn resolve_coin(&self, id: &str) -> Result<Coin> {
        Coin::builtin(id).ok_or_else(|| anyhow!("unknown coin '{id}'"))
    }

    pub fn resolve_node(&self, id: &str) -> Result<CoinNode> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .or_else(|| CoinNode::builtin(id))
            .ok_or_else(|| anyhow!("unknown node kind '{id}'"))
    }

    pub fn resolve_network(&self, id: &str) -> Result<CoinNetwork> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .or_else(|| CoinNetwork::builtin(id))
            .ok_or_else(|| anyhow!("unknown network '{id}'"))
    }

    /// Daemons to supervise, with the single-daemon fallback applied.
    pub fn daemon_entries(&self) -> Vec<DaemonEntry> {
        if !self.daemons.is_empty() {
            return self.daemons.clone();
        }
        vec![DaemonEntry {
            coin: self.coin.clone(),
            node: "vertcoind".to_string(),
            network: self.network.clone(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env() -> Environment {
        environment().source(Some(HashMap::new()))
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        let cfg = Config::load_with(None, no_env()).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:27888");
        assert_eq!(cfg.network, "mainnet");
        assert_eq!(cfg.journal_capacity, 256);
        assert_eq!(cfg.supervisor.base_port, 56200);
        assert_eq!(cfg.supervisor.sweep_interval_secs, 5);
    }

    #[test]
    fn file_values_and_daemons() {
        let file = write_toml(
            r#"
            network = "regtest"
            cors = true

            [supervisor]
            base_port = 46200
            data_dir = "/srv/coinhost"

            [[daemons]]
            coin = "vtc"
            node = "vertcoind"
            network = "regtest"

            [[daemons]]
            coin = "vtc"
            node = "vertcoind"
            network = "testnet"
            "#,
        );
        let cfg = Config::load_with(Some(file.path()), no_env()).unwrap();
        assert!(cfg.cors);
        assert_eq!(cfg.network, "regtest");
        assert_eq!(cfg.daemon_entries().len(), 2);
        assert_eq!(cfg.daemon_entries()[1].network, "testnet");

        let sup = cfg.supervisor.to_supervisor_config();
        assert_eq!(sup.base_port, 46200);
        assert_eq!(sup.data_dir, PathBuf::from("/srv/coinhost"));
        // unset fields keep their defaults
        assert_eq!(sup.min_chain_height, 101);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml("bind = \"0.0.0.0:1\"\n");
        let cfg = Config::load_with(
            Some(file.path()),
            env(&[
                ("COINHOST__BIND", "0.0.0.0:2"),
                ("COINHOST__SUPERVISOR__BASE_PORT", "50000"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:2");
        assert_eq!(cfg.supervisor.base_port, 50000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = Path::new("/nonexistent/coinhost.toml");
        let err = Config::load_with(Some(path), no_env()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/coinhost.toml"));
    }

    #[test]
    fn empty_daemon_list_supervises_active_network() {
        let cfg = Config {
            network: "testnet".into(),
            ..Config::default()
        };
        assert_eq!(
            cfg.daemon_entries(),
            vec![DaemonEntry {
                coin: "vtc".into(),
                node: "vertcoind".into(),
                network: "testnet".into()
            }]
        );
    }

    #[test]
    fn custom_network_overrides_builtin() {
        let cfg = Config {
            networks: vec![CoinNetwork {
                stealth_prefix: "xs".into(),
                ..CoinNetwork::regtest()
            }],
            ..Config::default()
        };
        assert_eq!(cfg.resolve_network("regtest").unwrap().stealth_prefix, "xs");
        assert_eq!(cfg.resolve_network("testnet").unwrap(), CoinNetwork::testnet());
        assert!(cfg.resolve_network("signet").is_err());
        assert!(cfg.resolve_node("bitcoind").is_err());
    }
}
