//! Coin, node-kind and network parameters.
//!
//! A supervised daemon is identified by a `(Coin, CoinNode, CoinNetwork)`
//! triple. The same [`Coin`] and [`CoinNetwork`] values drive transfer
//! routing: the coin supplies the asset symbols, the network supplies the
//! address prefixes the codec validates against.
//!
//! Builtin definitions cover Vertcoin on mainnet, testnet and regtest.
//! Deployments can define further coins and networks in configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::RPC_PORT_OFFSET;

/// A coin served by the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Short identifier used in configuration and logs (e.g. `vtc`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Asset id that selects a plain native transfer.
    pub symbol: String,
    /// Asset id that selects a stealth native transfer.
    pub stealth_symbol: String,
}

impl Coin {
    /// Vertcoin: `VTC` plain, `SVTC` stealth.
    pub fn vertcoin() -> Self {
        Self {
            id: "vtc".to_string(),
            name: "Vertcoin".to_string(),
            symbol: "VTC".to_string(),
            stealth_symbol: "SVTC".to_string(),
        }
    }

    /// Look up a builtin coin by id.
    pub fn builtin(id: &str) -> Option<Self> {
        match id {
            "vtc" => Some(Self::vertcoin()),
            _ => None,
        }
    }
}

/// The kind of node binary backing a coin (e.g. `vertcoind`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinNode {
    pub id: String,
    /// Executable to launch. Resolved through `PATH` when relative.
    pub binary: PathBuf,
    /// Extra arguments passed on every launch.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CoinNode {
    pub fn vertcoind() -> Self {
        Self {
            id: "vertcoind".to_string(),
            binary: PathBuf::from("vertcoind"),
            args: vec!["-server=1".to_string(), "-txindex=1".to_string()],
        }
    }

    /// Look up a builtin node kind by id.
    pub fn builtin(id: &str) -> Option<Self> {
        match id {
            "vertcoind" => Some(Self::vertcoind()),
            _ => None,
        }
    }
}

/// A network a coin runs on, with its address prefixes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinNetwork {
    pub id: String,
    /// Human-readable part of segwit recipient addresses.
    pub segwit_hrp: String,
    /// Human-readable part of stealth addresses.
    pub stealth_prefix: String,
    /// Whether the supervisor mines blocks on demand for this network.
    #[serde(default)]
    pub on_demand_blocks: bool,
    /// Flags that select this network on the node command line.
    #[serde(default)]
    pub node_args: Vec<String>,
}

impl CoinNetwork {
    pub fn mainnet() -> Self {
        Self {
            id: "mainnet".to_string(),
            segwit_hrp: "vtc".to_string(),
            stealth_prefix: "vs".to_string(),
            on_demand_blocks: false,
            node_args: Vec::new(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            id: "testnet".to_string(),
            segwit_hrp: "tvtc".to_string(),
            stealth_prefix: "tvs".to_string(),
            on_demand_blocks: false,
            node_args: vec!["-testnet".to_string()],
        }
    }

    /// Local regression-test network. Blocks only appear when the
    /// supervisor generates them.
    pub fn regtest() -> Self {
        Self {
            id: "regtest".to_string(),
            segwit_hrp: "bcrt".to_string(),
            stealth_prefix: "rvs".to_string(),
            on_demand_blocks: true,
            node_args: vec!["-regtest".to_string()],
        }
    }

    /// Look up a builtin network by id.
    pub fn builtin(id: &str) -> Option<Self> {
        match id {
            "mainnet" => Some(Self::mainnet()),
            "testnet" => Some(Self::testnet()),
            "regtest" => Some(Self::regtest()),
            _ => None,
        }
    }
}

/// Full identity of one supervised daemon.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaemonSpec {
    pub coin: Coin,
    pub node: CoinNode,
    pub network: CoinNetwork,
    /// P2P listen port assigned by the supervisor.
    pub port: u16,
}

impl DaemonSpec {
    /// JSON-RPC port, a fixed offset above the P2P port.
    pub fn rpc_port(&self) -> u16 {
        self.port.saturating_add(RPC_PORT_OFFSET)
    }

    /// `coin/node/network` label for logs.
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.coin.id, self.node.id, self.network.id)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl fmt::Display for CoinNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl fmt::Display for CoinNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertcoin_symbols() {
        let coin = Coin::vertcoin();
        assert_eq!(coin.symbol, "VTC");
        assert_eq!(coin.stealth_symbol, "SVTC");
    }

    #[test]
    fn builtin_lookup_unknown_is_none() {
        assert!(Coin::builtin("btc").is_none());
        assert!(CoinNode::builtin("bitcoind").is_none());
        assert!(CoinNetwork::builtin("signet").is_none());
    }

    #[test]
    fn only_regtest_generates_on_demand() {
        assert!(!CoinNetwork::mainnet().on_demand_blocks);
        assert!(!CoinNetwork::testnet().on_demand_blocks);
        assert!(CoinNetwork::regtest().on_demand_blocks);
    }

    #[test]
    fn network_prefixes_are_distinct() {
        let nets = [
            CoinNetwork::mainnet(),
            CoinNetwork::testnet(),
            CoinNetwork::regtest(),
        ];
        for (i, a) in nets.iter().enumerate() {
            for b in &nets[i + 1..] {
                assert_ne!(a.segwit_hrp, b.segwit_hrp);
                assert_ne!(a.stealth_prefix, b.stealth_prefix);
            }
        }
    }

    #[test]
    fn network_deserializes_with_defaults() {
        let json = r#"{"id":"custom","segwit_hrp":"cx","stealth_prefix":"cs"}"#;
        let net: CoinNetwork = serde_json::from_str(json).unwrap();
        assert!(!net.on_demand_blocks);
        assert!(net.node_args.is_empty());
    }

    #[test]
    fn daemon_spec_rpc_port_and_label() {
        let spec = DaemonSpec {
            coin: Coin::vertcoin(),
            node: CoinNode::vertcoind(),
            network: CoinNetwork::regtest(),
            port: 56203,
        };
        assert_eq!(spec.rpc_port(), 57203);
        assert_eq!(spec.label(), "vtc/vertcoind/regtest");
    }

    #[test]
    fn display_is_id() {
        assert_eq!(CoinNetwork::regtest().to_string(), "regtest");
        assert_eq!(CoinNode::vertcoind().to_string(), "vertcoind");
    }
}
