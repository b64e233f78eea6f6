//! Daemon lifecycle supervisor.
//!
//! [`Supervisor`] owns an insertion-ordered registry of [`Daemon`]s and runs a
//! level-triggered reconciliation loop over it: every sweep re-checks every
//! daemon, starting dead ones and generating blocks where due, then sleeps.
//! A crashed daemon is therefore brought back on the next sweep without any
//! event plumbing.
//!
//! Lifecycle:
//! - [`Supervisor::run`] may be called once; it returns after shutdown.
//! - [`Supervisor::stop`] may be called once. It returns only after the
//!   loop has finished its current sweep and stopped every daemon. A second
//!   call fails with [`SupervisorError::StopAlreadyRequested`].
//! - A `stop` that lands before the loop has taken over (including a `run`
//!   task that is spawned but not yet polled) stops the daemons itself; the
//!   pending `run` then returns `Ok(())` without sweeping.
//!
//! The registry lock only guards structural changes and per-sweep snapshots;
//! it is never held while a daemon is being started, stopped or mined on.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use coinhost_core::constants::RPC_PORT_OFFSET;
use coinhost_core::error::SupervisorError;
use coinhost_core::params::{Coin, CoinNetwork, CoinNode, DaemonSpec};
use coinhost_core::traits::ProcessLauncher;

use crate::config::SupervisorConfig;
use crate::daemon::{Daemon, DaemonStatus};

type StopAck = oneshot::Sender<()>;

/// Stop handshake. The loop holds the receiver while running; `stop()` takes
/// the sender.
struct Control {
    stop_tx: Option<oneshot::Sender<StopAck>>,
    stop_rx: Option<oneshot::Receiver<StopAck>>,
    /// `stop()` got here before the loop took the receiver.
    stopped_early: bool,
}

/// Keeps a set of node daemons alive until told to stop.
pub struct Supervisor {
    daemons: Mutex<Vec<Arc<Daemon>>>,
    launcher: Arc<dyn ProcessLauncher>,
    config: SupervisorConfig,
    control: Mutex<Control>,
}

impl Supervisor {
    /// Create a supervisor with an empty registry.
    pub fn new(config: SupervisorConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        Self {
            daemons: Mutex::new(Vec::new()),
            launcher,
            config,
            control: Mutex::new(Control {
                stop_tx: Some(stop_tx),
                stop_rx: Some(stop_rx),
                stopped_early: false,
            }),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Register a daemon and return its port.
    ///
    /// The i-th daemon gets `base_port + i`. Both that port and its RPC port
    /// must fit in a `u16`. Safe to call while the loop is running; the new
    /// daemon is picked up by the next sweep.
    pub fn add_daemon(
        &self,
        coin: Coin,
        node: CoinNode,
        network: CoinNetwork,
    ) -> Result<u16, SupervisorError> {
        let mut daemons = self.daemons.lock();
        let index = daemons.len();
        let port = u16::try_from(index)
            .ok()
            .and_then(|i| self.config.base_port.checked_add(i))
            .filter(|p| p.checked_add(RPC_PORT_OFFSET).is_some())
            .ok_or(SupervisorError::PortsExhausted {
                base: self.config.base_port,
                index,
            })?;

        let spec = DaemonSpec {
            coin,
            node,
            network,
            port,
        };
        let process = self.launcher.launch_handle(&spec);
        info!(daemon = %spec.label(), port, "daemon registered");
        daemons.push(Arc::new(Daemon::new(spec, process)));
        Ok(port)
    }

    /// Snapshot of every registered daemon, in registration order.
    pub fn daemons(&self) -> Vec<DaemonStatus> {
        self.daemons.lock().iter().map(|d| d.status()).collect()
    }

    pub fn len(&self) -> usize {
        self.daemons.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.daemons.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<Daemon>> {
        self.daemons.lock().clone()
    }

    /// One pass over all daemons in registration order. Failures are logged
    /// per daemon and never stop the pass.
    pub async fn sweep(&self) {
        let daemons = self.snapshot();
        debug!(count = daemons.len(), "sweep");

        for d in &daemons {
            let spec = d.spec();
            if let Err(e) = d.start_if_necessary().await {
                error!(coin = %spec.coin, network = %spec.network, port = spec.port, "error in daemon: {e}");
            }
            if let Err(e) = d.generate_if_necessary().await {
                error!(coin = %spec.coin, network = %spec.network, port = spec.port, "error generating block: {e}");
            }
        }
    }

    async fn stop_all(&self) {
        for d in &self.snapshot() {
            let spec = d.spec();
            if let Err(e) = d.stop().await {
                error!(coin = %spec.coin, network = %spec.network, port = spec.port, "error stopping daemon: {e}");
            }
        }
    }

    /// Run the reconciliation loop until [`stop`](Self::stop) is called.
    ///
    /// Stop requests are honoured between sweeps: the current sweep always
    /// completes, then every daemon is stopped and the caller of `stop` is
    /// released.
    pub async fn run(&self) -> Result<(), SupervisorError> {
        let mut stop_rx = {
            let mut control = self.control.lock();
            if std::mem::take(&mut control.stopped_early) {
                info!("stop already handled, supervisor loop not started");
                return Ok(());
            }
            control
                .stop_rx
                .take()
                .ok_or(SupervisorError::AlreadyRunning)?
        };

        info!(
            daemons = self.len(),
            interval_ms = self.config.sweep_interval.as_millis() as u64,
            "supervisor loop started"
        );

        loop {
            self.sweep().await;

            tokio::select! {
                ack = &mut stop_rx => {
                    info!("stop requested, stopping daemons");
                    self.stop_all().await;
                    if let Ok(ack) = ack {
                        // The stopper may have given up waiting.
                        let _ = ack.send(());
                    }
                    info!("supervisor loop stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.sweep_interval) => {}
            }
        }
    }

    /// Stop the loop and every daemon, waiting until both are done.
    ///
    /// Must be called at most once. If the loop has not taken over yet, the
    /// daemons are stopped directly and the next `run` returns at once.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let (stop_tx, loop_pending) = {
            let mut control = self.control.lock();
            let stop_tx = control
                .stop_tx
                .take()
                .ok_or(SupervisorError::StopAlreadyRequested)?;
            let loop_pending = control.stop_rx.take().is_some();
            control.stopped_early = loop_pending;
            (stop_tx, loop_pending)
        };

        if loop_pending {
            info!("stop before loop start, stopping daemons directly");
            self.stop_all().await;
            return Ok(());
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        stop_tx.send(ack_tx).map_err(|_| SupervisorError::LoopGone)?;
        ack_rx.await.map_err(|_| SupervisorError::LoopGone)
    }
}
