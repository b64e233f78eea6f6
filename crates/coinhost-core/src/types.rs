//! Domain types for transfers.
//!
//! A [`TransferRequest`] is what a caller asks for; a [`TransferIntent`] is
//! what the wallet engine is asked to build. Key material types
//! ([`PubkeyHash`], [`StealthPubKey`], [`AssetId`]) serialize as lowercase
//! hex so journal entries and API responses stay readable.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{PUBKEY_HASH_LEN, STEALTH_PUBKEY_LEN};

/// 20-byte witness v0 pubkey hash of a recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PubkeyHash(pub [u8; PUBKEY_HASH_LEN]);

/// 33-byte compressed public key of a stealth recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StealthPubKey(pub [u8; STEALTH_PUBKEY_LEN]);

/// Raw colored-asset identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(pub Vec<u8>);

/// A serialized transaction as exchanged with the wallet engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WireTx(pub Vec<u8>);

/// Broadcast-confirmed transaction identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl PubkeyHash {
    pub fn as_bytes(&self) -> &[u8; PUBKEY_HASH_LEN] {
        &self.0
    }
}

impl StealthPubKey {
    pub fn as_bytes(&self) -> &[u8; STEALTH_PUBKEY_LEN] {
        &self.0
    }
}

impl AssetId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl WireTx {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PubkeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Display for StealthPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- hex serde ---

fn decode_fixed<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
    let s = String::deserialize(d)?;
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| serde::de::Error::invalid_length(b.len(), &"fixed-size hex key"))
}

impl Serialize for PubkeyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PubkeyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_fixed(deserializer).map(Self)
    }
}

impl Serialize for StealthPubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for StealthPubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        decode_fixed(deserializer).map(Self)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

impl Serialize for WireTx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WireTx {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// --- requests and intents ---

/// One transfer as requested by a caller. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    /// Native symbol, native stealth symbol, or a hex colored-asset id.
    pub asset_id: String,
    /// Amount in the smallest unit.
    pub amount: u64,
    pub recipient_address: String,
    /// Send change to a stealth output.
    pub use_stealth: bool,
}

/// Plain native send to a pubkey hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainSend {
    pub amount: u64,
    pub recipient: PubkeyHash,
}

/// Native send to a stealth public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthSend {
    pub amount: u64,
    pub recipient: StealthPubKey,
}

/// One colored-asset output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    pub asset_id: AssetId,
    pub value: u64,
    pub recipient: PubkeyHash,
}

/// Colored-asset send; one or more asset outputs in a single transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredAssetSend {
    pub transfers: Vec<AssetTransfer>,
}

/// The transaction the wallet engine is asked to build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferIntent {
    Plain(PlainSend),
    Stealth(StealthSend),
    ColoredAsset(ColoredAssetSend),
}

impl TransferIntent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Stealth(_) => "stealth",
            Self::ColoredAsset(_) => "colored_asset",
        }
    }
}

/// Outcome of a successful dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub txid: TxId,
}

/// Receive addresses derived by the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddresses {
    /// Plain native segwit address.
    pub native: String,
    /// Segwit address colored assets are received on.
    pub asset: String,
    pub stealth: String,
}
