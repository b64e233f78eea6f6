//! Node processes backed by real executables.
//!
//! [`CommandLauncher`] turns a [`DaemonSpec`] into a [`CommandProcess`] that
//! spawns the node binary with its own data directory and ports, talks to it
//! over JSON-RPC for block generation and shutdown, and kills it when it will
//! not exit on its own.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::de::DeserializeOwned;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use coinhost_core::error::DaemonError;
use coinhost_core::params::DaemonSpec;
use coinhost_core::traits::{NodeProcess, ProcessLauncher};

use crate::config::SupervisorConfig;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Launches node binaries as child processes.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    config: SupervisorConfig,
}

impl CommandLauncher {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch_handle(&self, spec: &DaemonSpec) -> Box<dyn NodeProcess> {
        Box::new(CommandProcess::new(spec.clone(), &self.config))
    }
}

/// One node binary run as a child of this process.
#[derive(Debug)]
pub struct CommandProcess {
    spec: DaemonSpec,
    data_dir: PathBuf,
    rpc_url: String,
    rpc_user: String,
    rpc_password: String,
    min_chain_height: u64,
    stop_grace: Duration,
    child: Option<Child>,
}

#[derive(serde::Deserialize)]
struct MempoolInfo {
    size: u64,
}

impl CommandProcess {
    pub fn new(spec: DaemonSpec, config: &SupervisorConfig) -> Self {
        Self {
            data_dir: config.daemon_dir(&spec),
            rpc_url: config.rpc_url(&spec),
            rpc_user: config.rpc_user.clone(),
            rpc_password: config.rpc_password.clone(),
            min_chain_height: config.min_chain_height,
            stop_grace: config.stop_grace,
            child: None,
            spec,
        }
    }

    /// Command line passed to the node binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-datadir={}", self.data_dir.display()),
            format!("-port={}", self.spec.port),
            format!("-rpcport={}", self.spec.rpc_port()),
            format!("-rpcuser={}", self.rpc_user),
            format!("-rpcpassword={}", self.rpc_password),
            "-rpcbind=127.0.0.1".to_string(),
            "-rpcallowip=127.0.0.1".to_string(),
        ];
        args.extend(self.spec.network.node_args.iter().cloned());
        args.extend(self.spec.node.args.iter().cloned());
        args
    }

    fn client(&self) -> Result<HttpClient, String> {
        HttpClientBuilder::default()
            .request_timeout(RPC_TIMEOUT)
            .build(&self.rpc_url)
            .map_err(|e| format!("rpc client: {e}"))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: ArrayParams) -> Result<T, String> {
        self.client()?
            .request(method, params)
            .await
            .map_err(|e| format!("{method}: {e}"))
    }

    /// Wait for the child to exit, killing it after the grace period.
    async fn reap(&mut self) -> Result<(), DaemonError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.stop_grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(daemon = %self.spec.label(), %status, "node exited");
                Ok(())
            }
            Ok(Err(e)) => Err(DaemonError::Stop(format!("wait: {e}"))),
            Err(_) => {
                warn!(daemon = %self.spec.label(), "node did not exit in time, killing");
                child
                    .kill()
                    .await
                    .map_err(|e| DaemonError::Stop(format!("kill: {e}")))
            }
        }
    }
}

#[async_trait]
impl NodeProcess for CommandProcess {
    fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!(daemon = %self.spec.label(), %status, "node has exited");
                self.child = None;
                false
            }
            Some(Err(e)) => {
                warn!(daemon = %self.spec.label(), "cannot poll node: {e}");
                false
            }
            None => false,
        }
    }

    async fn start(&mut self) -> Result<(), DaemonError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| DaemonError::Start(format!("{}: {e}", self.data_dir.display())))?;

        let child = Command::new(&self.spec.node.binary)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DaemonError::Start(format!("{}: {e}", self.spec.node.binary.display())))?;

        info!(
            daemon = %self.spec.label(),
            pid = child.id().unwrap_or_default(),
            datadir = %self.data_dir.display(),
            "spawned node"
        );
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DaemonError> {
        if self.child.is_none() {
            return Ok(());
        }
        if let Err(e) = self.call::<serde_json::Value>("stop", ArrayParams::new()).await {
            warn!(daemon = %self.spec.label(), "rpc stop failed, waiting before kill: {e}");
        }
        self.reap().await
    }

    async fn generate_block_if_due(&mut self) -> Result<u64, DaemonError> {
        let height: u64 = self
            .call("getblockcount", ArrayParams::new())
            .await
            .map_err(DaemonError::Generate)?;

        let blocks = if height < self.min_chain_height {
            self.min_chain_height - height
        } else {
            let mempool: MempoolInfo = self
                .call("getmempoolinfo", ArrayParams::new())
                .await
                .map_err(DaemonError::Generate)?;
            u64::from(mempool.size > 0)
        };
        if blocks == 0 {
            return Ok(0);
        }

        let mut params = ArrayParams::new();
        params
            .insert(blocks)
            .map_err(|e| DaemonError::Generate(e.to_string()))?;
        let hashes: Vec<String> = self
            .call("generate", params)
            .await
            .map_err(DaemonError::Generate)?;
        Ok(hashes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinhost_core::params::{Coin, CoinNetwork, CoinNode};

    fn spec(binary: &str) -> DaemonSpec {
        DaemonSpec {
            coin: Coin::vertcoin(),
            node: CoinNode {
                binary: PathBuf::from(binary),
                ..CoinNode::vertcoind()
            },
            network: CoinNetwork::regtest(),
            port: 56202,
        }
    }

    fn config(dir: &tempfile::TempDir) -> SupervisorConfig {
        SupervisorConfig {
            data_dir: dir.path().to_path_buf(),
            stop_grace: Duration::from_millis(200),
            ..SupervisorConfig::default()
        }
    }

    #[test]
    fn args_carry_ports_datadir_and_network() {
        let dir = tempfile::tempdir().unwrap();
        let process = CommandProcess::new(spec("vertcoind"), &config(&dir));
        let args = process.args();

        let datadir = dir.path().join("vtc/regtest/vertcoind");
        assert_eq!(args[0], format!("-datadir={}", datadir.display()));
        assert!(args.contains(&"-port=56202".to_string()));
        assert!(args.contains(&"-rpcport=57202".to_string()));
        assert!(args.contains(&"-rpcuser=coinhost".to_string()));
        assert!(args.contains(&"-regtest".to_string()));
        assert!(args.contains(&"-txindex=1".to_string()));
    }

    #[tokio::test]
    async fn missing_binary_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut process =
            CommandProcess::new(spec("/nonexistent/coinhost/vertcoind"), &config(&dir));
        let err = process.start().await.unwrap_err();
        assert!(matches!(err, DaemonError::Start(_)), "{err:?}");
        assert!(!process.is_running());
        // data directory is prepared before spawning
        assert!(dir.path().join("vtc/regtest/vertcoind").is_dir());
    }

    #[tokio::test]
    async fn stop_without_child_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = CommandProcess::new(spec("vertcoind"), &config(&dir));
        process.stop().await.unwrap();
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn generation_without_node_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SupervisorConfig {
            base_port: 1,
            ..config(&dir)
        };
        let spec = DaemonSpec { port: 1, ..spec("vertcoind") };
        let mut process = CommandProcess::new(spec, &cfg);
        let err = process.generate_block_if_due().await.unwrap_err();
        assert!(matches!(err, DaemonError::Generate(_)), "{err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unresponsive_node_is_killed_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = CommandProcess::new(spec("sleep"), &config(&dir));
        // `sleep` rejects the node flags and exits; give it something to run instead
        process.child = Some(
            Command::new("sleep")
                .arg("30")
                .kill_on_drop(true)
                .spawn()
                .unwrap(),
        );
        assert!(process.is_running());
        process.stop().await.unwrap();
        assert!(!process.is_running());
    }
}
