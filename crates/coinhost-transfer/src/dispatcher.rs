//! Transfer dispatch: route, build, sign, broadcast.
//!
//! Routing is a total function of the request's asset id:
//!
//! | asset id                  | intent                           | recipient decoded as |
//! |---------------------------|----------------------------------|----------------------|
//! | coin symbol (`VTC`)       | [`TransferIntent::Plain`]        | segwit               |
//! | stealth symbol (`SVTC`)   | [`TransferIntent::Stealth`]      | stealth              |
//! | anything else             | [`TransferIntent::ColoredAsset`] | segwit               |
//!
//! Every request is validated completely before the wallet engine is
//! touched, so malformed requests never cause wallet calls. A broadcast
//! failure is recorded in the [`BroadcastJournal`] before it is returned.

use std::sync::Arc;

use tracing::{debug, info, warn};

use coinhost_core::address::{decode_segwit, decode_stealth};
use coinhost_core::error::{TransferError, WalletError};
use coinhost_core::params::{Coin, CoinNetwork};
use coinhost_core::traits::WalletEngine;
use coinhost_core::types::{
    AssetId, AssetTransfer, ColoredAssetSend, PlainSend, StealthSend, TransferIntent,
    TransferRequest, TransferResult, WireTx,
};

use crate::journal::BroadcastJournal;

/// Map a request to the transaction it asks for.
///
/// Pure: decodes the recipient and, for colored assets, the asset id, but
/// performs no I/O.
pub fn route(
    request: &TransferRequest,
    coin: &Coin,
    network: &CoinNetwork,
) -> Result<TransferIntent, TransferError> {
    let amount = request.amount;
    let recipient = request.recipient_address.as_str();

    if request.asset_id == coin.symbol {
        let recipient = decode_segwit(recipient, network)?;
        return Ok(TransferIntent::Plain(PlainSend { amount, recipient }));
    }

    if request.asset_id == coin.stealth_symbol {
        let recipient = decode_stealth(recipient, network)?.pubkey;
        return Ok(TransferIntent::Stealth(StealthSend { amount, recipient }));
    }

    let asset_id = parse_asset_id(&request.asset_id)?;
    let recipient = decode_segwit(recipient, network)?;
    Ok(TransferIntent::ColoredAsset(ColoredAssetSend {
        transfers: vec![AssetTransfer {
            asset_id,
            value: amount,
            recipient,
        }],
    }))
}

fn parse_asset_id(s: &str) -> Result<AssetId, TransferError> {
    if s.is_empty() {
        return Err(TransferError::AssetIdFormat("empty asset id".to_string()));
    }
    hex::decode(s)
        .map(AssetId)
        .map_err(|e| TransferError::AssetIdFormat(e.to_string()))
}

/// Carries transfer requests through the wallet engine.
///
/// Holds no per-request state; concurrent dispatches only contend inside
/// the wallet engine and, on failure, the journal.
pub struct TransferDispatcher {
    wallet: Arc<dyn WalletEngine>,
    coin: Coin,
    network: CoinNetwork,
    journal: Arc<BroadcastJournal>,
}

impl TransferDispatcher {
    pub fn new(
        wallet: Arc<dyn WalletEngine>,
        coin: Coin,
        network: CoinNetwork,
        journal: Arc<BroadcastJournal>,
    ) -> Self {
        Self {
            wallet,
            coin,
            network,
            journal,
        }
    }

    pub fn coin(&self) -> &Coin {
        &self.coin
    }

    pub fn network(&self) -> &CoinNetwork {
        &self.network
    }

    pub fn journal(&self) -> &Arc<BroadcastJournal> {
        &self.journal
    }

    pub fn wallet(&self) -> &Arc<dyn WalletEngine> {
        &self.wallet
    }

    /// Route `request` against this dispatcher's coin and network.
    pub fn route(&self, request: &TransferRequest) -> Result<TransferIntent, TransferError> {
        route(request, &self.coin, &self.network)
    }

    /// Build, sign and broadcast the transaction `request` asks for.
    ///
    /// Not idempotent: two identical calls broadcast two transactions.
    pub async fn dispatch(&self, request: &TransferRequest) -> Result<TransferResult, TransferError> {
        let intent = self.route(request)?;
        debug!(asset = %request.asset_id, kind = intent.kind(), amount = request.amount, "routed transfer");

        let mut tx = self
            .build(&intent, request.use_stealth)
            .await
            .map_err(TransferError::TxBuild)?;

        self.wallet
            .sign_my_inputs(&mut tx)
            .await
            .map_err(TransferError::Signing)?;

        match self.wallet.send_transaction(&tx).await {
            Ok(txid) => {
                info!(asset = %request.asset_id, kind = intent.kind(), %txid, "transfer broadcast");
                Ok(TransferResult { txid })
            }
            Err(source) => {
                let journal_id = self.journal.record(intent, tx, source.to_string());
                warn!(asset = %request.asset_id, journal_id, "broadcast failed: {source}");
                Err(TransferError::Broadcast { source, journal_id })
            }
        }
    }

    async fn build(
        &self,
        intent: &TransferIntent,
        use_stealth_change: bool,
    ) -> Result<WireTx, WalletError> {
        match intent {
            TransferIntent::Plain(send) => {
                self.wallet
                    .generate_normal_send_tx(send, use_stealth_change)
                    .await
            }
            TransferIntent::Stealth(send) => {
                self.wallet.generate_stealth_tx(send, use_stealth_change).await
            }
            TransferIntent::ColoredAsset(send) => self.wallet.generate_open_asset_tx(send).await,
        }
    }
}
