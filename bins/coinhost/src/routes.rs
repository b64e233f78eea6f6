//! Axum router and HTTP handlers.
//!
//! Request and response bodies keep the wallet API's PascalCase field names
//! (`AssetID`, `TxID`, ...). Operator endpoints (`/api/daemons`,
//! `/api/failedBroadcasts`) return the library types as they serialize.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use coinhost_core::error::TransferError;
use coinhost_core::traits::WalletEngine;
use coinhost_core::types::TransferRequest;
use coinhost_daemon::{DaemonStatus, Supervisor};
use coinhost_transfer::{FailedBroadcast, TransferDispatcher};

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<TransferDispatcher>,
    pub supervisor: Arc<Supervisor>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/api/transferAsset", post(transfer_asset))
        .route("/api/addresses", get(addresses))
        .route("/api/network", get(network))
        .route("/api/daemons", get(daemons))
        .route("/api/failedBroadcasts", get(failed_broadcasts))
        .route("/api/failedBroadcasts/:id", delete(acknowledge_failed_broadcast))
        .with_state(state);

    if cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON `{"error": ...}` with a status code.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self(status, e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TransferAssetParameters {
    #[serde(rename = "AssetID")]
    pub asset_id: String,
    #[serde(rename = "Amount")]
    pub amount: u64,
    #[serde(rename = "RecipientAddress")]
    pub recipient_address: String,
    #[serde(rename = "UseStealth", default)]
    pub use_stealth: bool,
}

#[derive(Debug, Serialize)]
pub struct TransferAssetResult {
    #[serde(rename = "TxID")]
    pub txid: String,
}

/// `POST /api/transferAsset`: route, build, sign and broadcast a transfer.
async fn transfer_asset(
    State(state): State<AppState>,
    Json(params): Json<TransferAssetParameters>,
) -> Result<Json<TransferAssetResult>, ApiError> {
    let request = TransferRequest {
        asset_id: params.asset_id,
        amount: params.amount,
        recipient_address: params.recipient_address.trim().to_string(),
        use_stealth: params.use_stealth,
    };

    match state.dispatcher.dispatch(&request).await {
        Ok(result) => {
            info!(txid = %result.txid, asset = %request.asset_id, "transfer sent");
            Ok(Json(TransferAssetResult {
                txid: result.txid.to_string(),
            }))
        }
        Err(e) => {
            warn!(error = %e, asset = %request.asset_id, "transfer failed");
            Err(e.into())
        }
    }
}

#[derive(Debug, Serialize)]
struct AddressesResponse {
    #[serde(rename = "VertcoinAddress")]
    native: String,
    #[serde(rename = "AssetAddress")]
    asset: String,
    #[serde(rename = "StealthAddress")]
    stealth: String,
}

/// `GET /api/addresses`: the wallet's receive addresses.
async fn addresses(State(state): State<AppState>) -> Result<Json<AddressesResponse>, ApiError> {
    let addrs = state
        .dispatcher
        .wallet()
        .addresses()
        .await
        .map_err(|e| ApiError(StatusCode::BAD_GATEWAY, format!("error fetching addresses: {e}")))?;

    Ok(Json(AddressesResponse {
        native: addrs.native,
        asset: addrs.asset,
        stealth: addrs.stealth,
    }))
}

/// `GET /api/network`: active coin and network parameters.
async fn network(State(state): State<AppState>) -> impl IntoResponse {
    let coin = state.dispatcher.coin();
    let net = state.dispatcher.network();
    Json(json!({
        "Coin": coin.id,
        "Symbol": coin.symbol,
        "StealthSymbol": coin.stealth_symbol,
        "Network": net.id,
        "SegwitPrefix": net.segwit_hrp,
        "StealthAddressPrefix": net.stealth_prefix,
    }))
}

/// `GET /api/daemons`: supervisor snapshot.
async fn daemons(State(state): State<AppState>) -> Json<Vec<DaemonStatus>> {
    Json(state.supervisor.daemons())
}

/// `GET /api/failedBroadcasts`: journal entries, oldest first.
async fn failed_broadcasts(State(state): State<AppState>) -> Json<Vec<FailedBroadcast>> {
    Json(state.dispatcher.journal().entries())
}

/// `DELETE /api/failedBroadcasts/:id`: acknowledge a recovered entry.
async fn acknowledge_failed_broadcast(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    match state.dispatcher.journal().remove(id) {
        Some(entry) => {
            info!(journal_id = entry.id, tx = %entry.tx.to_hex(), "failed broadcast acknowledged");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError(
            StatusCode::NOT_FOUND,
            format!("no failed broadcast with id {id}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use coinhost_core::params::{Coin, CoinNetwork, CoinNode};
    use coinhost_daemon::SupervisorConfig;
    use coinhost_tests::helpers::{FakeLauncher, FakeWallet, segwit_address};
    use coinhost_transfer::BroadcastJournal;

    fn app(wallet: Arc<FakeWallet>) -> (Router, AppState) {
        let dispatcher = TransferDispatcher::new(
            wallet,
            Coin::vertcoin(),
            CoinNetwork::regtest(),
            Arc::new(BroadcastJournal::new(4)),
        );
        let supervisor = Supervisor::new(SupervisorConfig::default(), FakeLauncher::new());
        supervisor
            .add_daemon(Coin::vertcoin(), CoinNode::vertcoind(), CoinNetwork::regtest())
            .unwrap();
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            supervisor: Arc::new(supervisor),
        };
        (router(state.clone(), true), state)
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn transfer(asset: &str, recipient: String) -> serde_json::Value {
        json!({
            "AssetID": asset,
            "Amount": 100000,
            "RecipientAddress": recipient,
            "UseStealth": false,
        })
    }

    #[tokio::test]
    async fn transfer_returns_txid() {
        let (app, _) = app(FakeWallet::new());
        let body = transfer("VTC", segwit_address(4, &CoinNetwork::regtest()));
        let (status, json) = call(app, Method::POST, "/api/transferAsset", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["TxID"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn bad_asset_id_is_bad_request() {
        let (app, _) = app(FakeWallet::new());
        let body = transfer("ZZ", segwit_address(4, &CoinNetwork::regtest()));
        let (status, json) = call(app, Method::POST, "/api/transferAsset", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("error decoding asset ID"));
    }

    #[tokio::test]
    async fn broadcast_failure_is_bad_gateway_and_listed() {
        let wallet = FakeWallet::new();
        wallet.reject_broadcasts();
        let (app, state) = app(wallet);

        let body = transfer("VTC", segwit_address(4, &CoinNetwork::regtest()));
        let (status, _) = call(app.clone(), Method::POST, "/api/transferAsset", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, json) = call(app.clone(), Method::GET, "/api/failedBroadcasts", None).await;
        assert_eq!(status, StatusCode::OK);
        let id = json[0]["id"].as_u64().unwrap();
        assert_eq!(json[0]["intent"]["kind"], "plain");

        let uri = format!("/api/failedBroadcasts/{id}");
        let (status, _) = call(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.dispatcher.journal().is_empty());

        let (status, _) = call(app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn addresses_and_network() {
        let (app, _) = app(FakeWallet::new());
        let (status, json) = call(app.clone(), Method::GET, "/api/addresses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["VertcoinAddress"].as_str().unwrap().starts_with("bcrt1"));
        assert!(json["StealthAddress"].as_str().unwrap().starts_with("rvs1"));

        let (_, json) = call(app, Method::GET, "/api/network", None).await;
        assert_eq!(json["StealthAddressPrefix"], "rvs");
        assert_eq!(json["Symbol"], "VTC");
    }

    #[tokio::test]
    async fn daemons_snapshot() {
        let (app, _) = app(FakeWallet::new());
        let (status, json) = call(app, Method::GET, "/api/daemons", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["port"], 56200);
        assert_eq!(json[0]["state"], "not_started");
    }
}
