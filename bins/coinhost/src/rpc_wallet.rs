//! Wallet engine reached over JSON-RPC.
//!
//! Transactions travel as hex strings; key material as lowercase hex.

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use coinhost_core::error::WalletError;
use coinhost_core::traits::WalletEngine;
use coinhost_core::types::{
    ColoredAssetSend, PlainSend, StealthSend, TxId, WalletAddresses, WireTx,
};

pub struct RpcWallet {
    client: HttpClient,
}

impl RpcWallet {
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        let client = HttpClientBuilder::default()
            .build(endpoint)
            .map_err(|e| anyhow::anyhow!("failed to build wallet RPC client for {endpoint}: {e}"))?;
        Ok(Self { client })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: ArrayParams) -> Result<T, WalletError> {
        self.client
            .request(method, params)
            .await
            .map_err(map_client_error)
    }

    async fn call_tx(&self, method: &str, params: ArrayParams) -> Result<WireTx, WalletError> {
        let hex: String = self.call(method, params).await?;
        WireTx::from_hex(&hex).map_err(|e| WalletError::Malformed(format!("{method}: {e}")))
    }
}

/// Errors the wallet itself returned are rejections; anything else is
/// transport.
fn map_client_error(e: ClientError) -> WalletError {
    match e {
        ClientError::Call(obj) => WalletError::Rejected(obj.message().to_string()),
        ClientError::ParseError(e) => WalletError::Malformed(e.to_string()),
        other => WalletError::Rpc(other.to_string()),
    }
}

fn push<T: Serialize>(params: &mut ArrayParams, value: T) -> Result<(), WalletError> {
    params
        .insert(value)
        .map_err(|e| WalletError::Malformed(format!("cannot encode parameter: {e}")))
}

/// `[recipient, amount, use_stealth_change]`, shared by both native sends.
fn send_params<K: Serialize>(
    recipient: &K,
    amount: u64,
    use_stealth_change: bool,
) -> Result<ArrayParams, WalletError> {
    let mut p = ArrayParams::new();
    push(&mut p, recipient)?;
    push(&mut p, amount)?;
    push(&mut p, use_stealth_change)?;
    Ok(p)
}

fn tx_params(tx: &WireTx) -> Result<ArrayParams, WalletError> {
    let mut p = ArrayParams::new();
    push(&mut p, tx)?;
    Ok(p)
}

#[async_trait]
impl WalletEngine for RpcWallet {
    async fn generate_normal_send_tx(
        &self,
        send: &PlainSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError> {
        let p = send_params(&send.recipient, send.amount, use_stealth_change)?;
        self.call_tx("generatenormalsendtx", p).await
    }

    async fn generate_stealth_tx(
        &self,
        send: &StealthSend,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError> {
        let p = send_params(&send.recipient, send.amount, use_stealth_change)?;
        self.call_tx("generatestealthtx", p).await
    }

    async fn generate_open_asset_tx(&self, send: &ColoredAssetSend) -> Result<WireTx, WalletError> {
        let mut p = ArrayParams::new();
        push(&mut p, &send.transfers)?;
        self.call_tx("generateopenassettx", p).await
    }

    async fn sign_my_inputs(&self, tx: &mut WireTx) -> Result<(), WalletError> {
        let signed = self.call_tx("signmyinputs", tx_params(tx)?).await?;
        *tx = signed;
        Ok(())
    }

    async fn send_transaction(&self, tx: &WireTx) -> Result<TxId, WalletError> {
        self.call("sendtransaction", tx_params(tx)?).await
    }

    async fn addresses(&self) -> Result<WalletAddresses, WalletError> {
        self.call("getaddresses", ArrayParams::new()).await
    }
}
