//! Trait interfaces for the collaborators coinhost drives.
//!
//! - [`WalletEngine`]: builds, signs and broadcasts transactions
//!   (an RPC-backed implementation lives in the service binary)
//! - [`NodeProcess`]: control of one external node process
//!   (coinhost-daemon implements it on top of `tokio::process`)
//! - [`ProcessLauncher`]: creates a [`NodeProcess`] for a daemon identity
//!
//! With the `testing` feature, mockall mocks (`MockWalletEngine`,
//! `MockNodeProcess`, `MockProcessLauncher`) are exported for downstream
//! test suites.

use async_trait::async_trait;

use crate::error::{DaemonError, WalletError};
use crate::params::DaemonSpec;
use crate::types::{
    ColoredAssetSend, PlainSend, StealthSend, TxId, WalletAddresses, WireTx,
};

/// Transaction construction, signing and broadcast.
///
/// Key management and UTXO selection are entirely the engine's concern,
/// including its own locking; callers may invoke it from many tasks at once.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WalletEngine: Send + Sync {
    /// Build an unsigned plain send. `use_stealth_change` selects a stealth
    /// change output.
    async fn generate_normal_send_tx(
        &self,
        send: &PlainSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError>;

    /// Build an unsigned send to a stealth public key.
    async fn generate_stealth_tx(
        &self,
        send: &StealthSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError>;

    /// Build an unsigned colored-asset transaction.
    async fn generate_open_asset_tx(&self, send: &ColoredAssetSend) -> Result<WireTx, WalletError>;

    /// Sign every input the wallet owns, in place.
    async fn sign_my_inputs(&self, tx: &mut WireTx) -> Result<(), WalletError>;

    /// Broadcast a signed transaction and return its id.
    async fn send_transaction(&self, tx: &WireTx) -> Result<TxId, WalletError>;

    /// Current receive addresses.
    async fn addresses(&self) -> Result<WalletAddresses, WalletError>;
}

/// Control of a single external node process.
///
/// Every operation reports failure through its return value; none may panic
/// the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NodeProcess: Send {
    /// Whether the process is alive right now.
    fn is_running(&mut self) -> bool;

    async fn start(&mut self) -> Result<(), DaemonError>;

    async fn stop(&mut self) -> Result<(), DaemonError>;

    /// Mine blocks if the node has something pending. Returns the number of
    /// blocks generated, zero when nothing was due.
    async fn generate_block_if_due(&mut self) -> Result<u64, DaemonError>;
}

/// Factory for [`NodeProcess`] handles.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ProcessLauncher: Send + Sync {
    fn launch_handle(&self, spec: &DaemonSpec) -> Box<dyn NodeProcess>;
}
