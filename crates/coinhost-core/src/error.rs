//! Error types for coinhost.
use thiserror::Error;

/// Failures decoding a recipient address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address: {0}")] Malformed(String),
    #[error("unsupported witness version {0}, expected 0")] WitnessVersion(u8),
    #[error("witness program is {0} bytes, expected 20")] ProgramLength(usize),
    #[error("address has wrong prefix {found}, expected {expected}")] WrongNetwork { found: String, expected: String },
    #[error("address has incorrect byte length {0}, expected 33")] InvalidKeyLength(usize),
    #[error("cannot encode address: {0}")] Encode(String),
}

/// Failures reported by the wallet engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("no spendable outputs")] NoUtxos,
    #[error("signing key not found for input {0}")] KeyNotFound(usize),
    #[error("rejected by node: {0}")] Rejected(String),
    #[error("wallet rpc: {0}")] Rpc(String),
    #[error("malformed wallet response: {0}")] Malformed(String),
}

/// Request-scoped failures of the transfer pipeline. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("error decoding recipient address: {0}")] AddressDecode(String),
    #[error("address has wrong prefix {found}, expected {expected}")] WrongNetwork { found: String, expected: String },
    #[error("address has incorrect byte length {len}, expected 33")] InvalidKeyLength { len: usize },
    #[error("error decoding asset ID: {0}")] AssetIdFormat(String),
    #[error("error generating transaction: {0}")] TxBuild(#[source] WalletError),
    #[error("error signing: {0}")] Signing(#[source] WalletError),
    #[error("error sending (journal entry {journal_id}): {source}")] Broadcast { source: WalletError, journal_id: u64 },
}

impl TransferError {
    /// Whether the request itself was at fault (HTTP 4xx class) rather than
    /// the wallet or the network behind it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AddressDecode(_)
                | Self::WrongNetwork { .. }
                | Self::InvalidKeyLength { .. }
                | Self::AssetIdFormat(_)
        )
    }
}

impl From<AddressError> for TransferError {
    fn from(e: AddressError) -> Self {
        match e {
            AddressError::WrongNetwork { found, expected } => Self::WrongNetwork { found, expected },
            AddressError::InvalidKeyLength(len) => Self::InvalidKeyLength { len },
            other => Self::AddressDecode(other.to_string()),
        }
    }
}

/// Failures controlling a node process. Isolated per daemon by the supervisor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaemonError {
    #[error("start failed: {0}")] Start(String),
    #[error("block generation failed: {0}")] Generate(String),
    #[error("stop failed: {0}")] Stop(String),
}

/// Misuse of the supervisor lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("no ports left above base {base} for daemon #{index}")] PortsExhausted { base: u16, index: usize },
    #[error("supervisor loop already running or stopped")] AlreadyRunning,
    #[error("stop already requested")] StopAlreadyRequested,
    #[error("supervisor loop exited without acknowledging stop")] LoopGone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_network_keeps_both_prefixes() {
        let e: TransferError = AddressError::WrongNetwork {
            found: "vs".into(),
            expected: "rvs".into(),
        }
        .into();
        assert_eq!(e.to_string(), "address has wrong prefix vs, expected rvs");
        assert!(e.is_client_error());
    }

    #[test]
    fn key_length_maps_to_invalid_key_length() {
        let e: TransferError = AddressError::InvalidKeyLength(32).into();
        assert_eq!(e, TransferError::InvalidKeyLength { len: 32 });
    }

    #[test]
    fn codec_failures_map_to_address_decode() {
        for err in [
            AddressError::Malformed("bad checksum".into()),
            AddressError::WitnessVersion(1),
            AddressError::ProgramLength(32),
        ] {
            let msg = err.to_string();
            assert_eq!(TransferError::from(err), TransferError::AddressDecode(msg));
        }
    }

    #[test]
    fn wallet_side_errors_are_not_client_errors() {
        let build = TransferError::TxBuild(WalletError::NoUtxos);
        let sign = TransferError::Signing(WalletError::KeyNotFound(0));
        let send = TransferError::Broadcast {
            source: WalletError::Rejected("txn-mempool-conflict".into()),
            journal_id: 7,
        };
        assert!(!build.is_client_error());
        assert!(!sign.is_client_error());
        assert!(!send.is_client_error());
        assert!(send.to_string().contains("journal entry 7"));
    }

    #[test]
    fn display_insufficient_funds() {
        let e = WalletError::InsufficientFunds { have: 100, need: 200 };
        assert_eq!(e.to_string(), "insufficient funds: have 100, need 200");
    }

    #[test]
    fn ports_exhausted_message() {
        let e = SupervisorError::PortsExhausted { base: 65530, index: 6 };
        assert_eq!(e.to_string(), "no ports left above base 65530 for daemon #6");
    }
}
