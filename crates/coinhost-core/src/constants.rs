//! Protocol and service constants.
//!
//! Port layout, sweep timing, and the byte lengths the address codec
//! enforces. Network-specific values (address prefixes, asset symbols)
//! live in [`crate::params`].

use std::time::Duration;

/// First port handed out by the supervisor. The i-th daemon added gets
/// `BASE_DAEMON_PORT + i`.
pub const BASE_DAEMON_PORT: u16 = 56200;

/// Distance between a daemon's P2P port and its JSON-RPC port.
///
/// # Examples
///
/// ```
/// use coinhost_core::constants::{BASE_DAEMON_PORT, RPC_PORT_OFFSET};
/// assert_eq!(BASE_DAEMON_PORT + RPC_PORT_OFFSET, 57200);
/// ```
pub const RPC_PORT_OFFSET: u16 = 1000;

/// Pause between two supervisor sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Length of a witness v0 pubkey hash program.
pub const PUBKEY_HASH_LEN: usize = 20;

/// Length of a compressed secp256k1 public key.
pub const STEALTH_PUBKEY_LEN: usize = 33;

/// Witness version accepted for segwit recipients.
pub const SEGWIT_VERSION: u8 = 0;

/// Default number of failed broadcasts retained for operator recovery.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

/// Regtest coinbase maturity; on-demand generation tops the chain up to this.
pub const COINBASE_MATURITY_HEIGHT: u64 = 101;
