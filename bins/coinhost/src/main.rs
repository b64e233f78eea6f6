//! coinhost: wallet service host.
//!
//! Supervises the coin node daemons the wallet depends on and serves the
//! transfer HTTP API. Ctrl+C drains the HTTP server, then stops every
//! daemon before exiting.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod config;
mod routes;
mod rpc_wallet;

use coinhost_core::traits::ProcessLauncher;
use coinhost_daemon::{CommandLauncher, Supervisor};
use coinhost_transfer::{BroadcastJournal, TransferDispatcher};
use crate::config::Config;
use routes::AppState;
use rpc_wallet::RpcWallet;

/// coinhost wallet service
#[derive(Parser, Debug)]
#[command(
    name = "coinhost",
    version,
    about = "Supervises coin node daemons and serves the wallet transfer API"
)]
struct Args {
    /// Configuration file (TOML). Defaults to ./coinhost.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    bind: Option<String>,

    /// Active network (mainnet, testnet, regtest or a configured id)
    #[arg(long)]
    network: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    /// Load the configuration and apply CLI overrides on top.
    fn into_config(self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    init_logging(&config.log_level, &config.log_format);

    info!("coinhost v{}", env!("CARGO_PKG_VERSION"));

    let launcher = Arc::new(CommandLauncher::new(config.supervisor.to_supervisor_config()));
    serve(config, launcher, shutdown_signal()).await
}

/// Wire up the service and run it until `shutdown` resolves.
///
/// Everything that can fail runs before the supervisor loop is spawned, so
/// an early error never leaves node processes behind.
async fn serve(
    config: Config,
    launcher: Arc<dyn ProcessLauncher>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let coin = config.resolve_coin(&config.coin)?;
    let network = config.resolve_network(&config.network)?;
    info!(coin = %coin, network = %network, wallet_rpc = %config.wallet_rpc, "active network");

    // Transfers.
    let wallet = Arc::new(RpcWallet::new(&config.wallet_rpc)?);
    let journal = Arc::new(BroadcastJournal::new(config.journal_capacity));
    let dispatcher = Arc::new(TransferDispatcher::new(wallet, coin, network, journal));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    // Daemons.
    let supervisor_config = config.supervisor.to_supervisor_config();
    info!(data_dir = %supervisor_config.data_dir.display(), base_port = supervisor_config.base_port, "supervisor configured");
    let supervisor = Arc::new(Supervisor::new(supervisor_config, launcher));

    for entry in config.daemon_entries() {
        let d_coin = config.resolve_coin(&entry.coin)?;
        let d_node = config.resolve_node(&entry.node)?;
        let d_network = config.resolve_network(&entry.network)?;
        supervisor
            .add_daemon(d_coin, d_node, d_network)
            .with_context(|| format!("failed to add daemon {}/{}/{}", entry.coin, entry.node, entry.network))?;
    }

    let runner = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.run().await })
    };

    let state = AppState {
        dispatcher,
        supervisor: Arc::clone(&supervisor),
    };
    let app = routes::router(state, config.cors);

    info!("Listening on http://{}", config.bind);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error");

    info!("stopping daemons");
    if let Err(e) = supervisor.stop().await {
        error!("supervisor stop failed: {e}");
    }
    match runner.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("supervisor loop failed: {e}"),
        Err(e) => error!("supervisor task panicked: {e}"),
    }

    info!("coinhost shutdown complete");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down...");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `format = "json"` gives structured JSON output; anything else is
/// human-readable text. `RUST_LOG` takes precedence over `level_str`.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
