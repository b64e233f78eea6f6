//! Shared fakes for integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use coinhost_core::address::{encode_segwit, encode_stealth};
use coinhost_core::error::{DaemonError, WalletError};
use coinhost_core::params::{CoinNetwork, DaemonSpec};
use coinhost_core::traits::{NodeProcess, ProcessLauncher, WalletEngine};
use coinhost_core::types::{
    ColoredAssetSend, PlainSend, PubkeyHash, StealthSend, TxId, WalletAddresses, WireTx,
};

/// Pubkey hash from a seed byte.
pub fn pkh(seed: u8) -> PubkeyHash {
    PubkeyHash([seed; 20])
}

/// Segwit address for `pkh(seed)` on `network`.
pub fn segwit_address(seed: u8, network: &CoinNetwork) -> String {
    encode_segwit(&pkh(seed), network).unwrap()
}

/// Stealth address for a compressed key filled with `seed` on `network`.
pub fn stealth_address(seed: u8, network: &CoinNetwork) -> String {
    let mut key = [seed; 33];
    key[0] = 0x02;
    encode_stealth(&key, &network.stealth_prefix).unwrap()
}

/// Bitcoin-style txid: double SHA-256, byte-reversed, hex.
pub fn txid_of(tx: &WireTx) -> TxId {
    let mut hash = Sha256::digest(Sha256::digest(tx.as_bytes()));
    hash.reverse();
    TxId(hex::encode(hash))
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// A wallet call as seen by [`FakeWallet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletCall {
    NormalSend { amount: u64, recipient: PubkeyHash, stealth_change: bool },
    StealthSend { amount: u64, stealth_change: bool },
    OpenAsset { asset_ids: Vec<String>, values: Vec<u64> },
    Sign,
    Send(TxId),
}

/// In-memory wallet engine.
///
/// Builds a deterministic byte encoding of each intent, "signs" by
/// appending a marker byte, and derives txids by hashing. Records every
/// call so tests can assert on the exact sequence.
#[derive(Default)]
pub struct FakeWallet {
    calls: Mutex<Vec<WalletCall>>,
    reject_broadcast: AtomicBool,
    nonce: AtomicU64,
}

impl FakeWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following broadcast fail.
    pub fn reject_broadcasts(&self) {
        self.reject_broadcast.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<WalletCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: WalletCall) {
        self.calls.lock().push(call);
    }

    /// Each built tx carries a fresh nonce so identical requests give
    /// distinct transactions, like a real wallet picking new inputs.
    fn build(&self, kind: u8, body: &[u8]) -> WireTx {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut bytes = vec![0x01, kind];
        bytes.extend_from_slice(&nonce.to_le_bytes());
        bytes.extend_from_slice(body);
        WireTx::new(bytes)
    }
}

#[async_trait]
impl WalletEngine for FakeWallet {
    async fn generate_normal_send_tx(
        &self,
        send: &PlainSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError> {
        self.record(WalletCall::NormalSend {
            amount: send.amount,
            recipient: send.recipient,
            stealth_change: use_stealth_change,
        });
        let mut body = send.amount.to_le_bytes().to_vec();
        body.extend_from_slice(send.recipient.as_bytes());
        Ok(self.build(0, &body))
    }

    async fn generate_stealth_tx(
        &self,
        send: &StealthSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError> {
        self.record(WalletCall::StealthSend {
            amount: send.amount,
            stealth_change: use_stealth_change,
        });
        let mut body = send.amount.to_le_bytes().to_vec();
        body.extend_from_slice(send.recipient.as_bytes());
        Ok(self.build(1, &body))
    }

    async fn generate_open_asset_tx(&self, send: &ColoredAssetSend) -> Result<WireTx, WalletError> {
        if send.transfers.is_empty() {
            return Err(WalletError::Malformed("no transfers".into()));
        }
        self.record(WalletCall::OpenAsset {
            asset_ids: send.transfers.iter().map(|t| t.asset_id.to_string()).collect(),
            values: send.transfers.iter().map(|t| t.value).collect(),
        });
        let mut body = Vec::new();
        for t in &send.transfers {
            body.extend_from_slice(t.asset_id.as_bytes());
            body.extend_from_slice(&t.value.to_le_bytes());
            body.extend_from_slice(t.recipient.as_bytes());
        }
        Ok(self.build(2, &body))
    }

    async fn sign_my_inputs(&self, tx: &mut WireTx) -> Result<(), WalletError> {
        self.record(WalletCall::Sign);
        tx.0.push(0x5f);
        Ok(())
    }

    async fn send_transaction(&self, tx: &WireTx) -> Result<TxId, WalletError> {
        if self.reject_broadcast.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("no peers".into()));
        }
        let txid = txid_of(tx);
        self.record(WalletCall::Send(txid.clone()));
        Ok(txid)
    }

    async fn addresses(&self) -> Result<WalletAddresses, WalletError> {
        let net = CoinNetwork::regtest();
        Ok(WalletAddresses {
            native: segwit_address(1, &net),
            asset: segwit_address(2, &net),
            stealth: stealth_address(3, &net),
        })
    }
}

// ---------------------------------------------------------------------------
// Node processes
// ---------------------------------------------------------------------------

/// Observable state of one fake node, shared between the process handle
/// and the test.
#[derive(Default)]
pub struct FakeNodeState {
    pub running: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_generate: AtomicBool,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    pub blocks: AtomicU64,
    pub generate_attempts: AtomicU32,
}

impl FakeNodeState {
    /// Simulate the process dying.
    pub fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn generate_attempts(&self) -> u32 {
        self.generate_attempts.load(Ordering::SeqCst)
    }
}

pub struct FakeNode {
    state: Arc<FakeNodeState>,
}

#[async_trait]
impl NodeProcess for FakeNode {
    fn is_running(&mut self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    async fn start(&mut self) -> Result<(), DaemonError> {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(DaemonError::Start("fake node refuses to start".into()));
        }
        self.state.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DaemonError> {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        self.state.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn generate_block_if_due(&mut self) -> Result<u64, DaemonError> {
        self.state.generate_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_generate.load(Ordering::SeqCst) {
            return Err(DaemonError::Generate("getblockcount: connection refused".into()));
        }
        self.state.blocks.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

/// Launcher that hands out [`FakeNode`]s and keeps their state by port.
#[derive(Default)]
pub struct FakeLauncher {
    nodes: Mutex<HashMap<u16, Arc<FakeNodeState>>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// State of the node launched for `port`.
    pub fn node(&self, port: u16) -> Arc<FakeNodeState> {
        self.nodes.lock()[&port].clone()
    }

    /// Number of process handles handed out so far.
    pub fn launched(&self) -> usize {
        self.nodes.lock().len()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch_handle(&self, spec: &DaemonSpec) -> Box<dyn NodeProcess> {
        let state = Arc::new(FakeNodeState::default());
        self.nodes.lock().insert(spec.port, state.clone());
        Box::new(FakeNode { state })
    }
}
