//! Recipient address codec.
//!
//! Two address kinds reach the transfer pipeline:
//! - segwit addresses ([BIP-173]) carrying a witness v0 program that is a
//!   20-byte pubkey hash, used for plain and colored-asset sends;
//! - stealth addresses, plain Bech32 strings whose payload is a 33-byte
//!   compressed public key, used for stealth sends.
//!
//! Both are validated against the active [`CoinNetwork`]. Decoding is pure;
//! callers surface failures directly and never retry.
//!
//! [BIP-173]: https://github.com/bitcoin/bips/blob/master/bip-0173.mediawiki

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};

use crate::constants::{PUBKEY_HASH_LEN, SEGWIT_VERSION, STEALTH_PUBKEY_LEN};
use crate::error::AddressError;
use crate::params::CoinNetwork;
use crate::types::{PubkeyHash, StealthPubKey};

/// A decoded stealth address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StealthAddress {
    /// Lowercased human-readable part.
    pub prefix: String,
    pub pubkey: StealthPubKey,
}

/// Decode a segwit recipient into its pubkey hash.
///
/// Rejects anything but a witness v0 program of exactly 20 bytes, and
/// addresses whose human-readable part belongs to another network.
pub fn decode_segwit(address: &str, network: &CoinNetwork) -> Result<PubkeyHash, AddressError> {
    let (hrp, version, program) =
        bech32::segwit::decode(address).map_err(|e| AddressError::Malformed(e.to_string()))?;

    let version = version.to_u8();
    if version != SEGWIT_VERSION {
        return Err(AddressError::WitnessVersion(version));
    }
    if program.len() != PUBKEY_HASH_LEN {
        return Err(AddressError::ProgramLength(program.len()));
    }
    check_prefix(&hrp, &network.segwit_hrp)?;

    let mut pkh = [0u8; PUBKEY_HASH_LEN];
    pkh.copy_from_slice(&program);
    Ok(PubkeyHash(pkh))
}

/// Encode a pubkey hash as a witness v0 address on `network`.
pub fn encode_segwit(pkh: &PubkeyHash, network: &CoinNetwork) -> Result<String, AddressError> {
    let hrp = parse_hrp(&network.segwit_hrp)?;
    bech32::segwit::encode_v0(hrp, pkh.as_bytes()).map_err(|e| AddressError::Encode(e.to_string()))
}

/// Split a stealth address into its prefix and raw payload without
/// validating either. Only the original Bech32 checksum is accepted;
/// Bech32m strings are malformed here.
pub fn decode_stealth_raw(address: &str) -> Result<(String, Vec<u8>), AddressError> {
    let checked = CheckedHrpstring::new::<Bech32>(address)
        .map_err(|e| AddressError::Malformed(e.to_string()))?;
    Ok((checked.hrp().to_lowercase(), checked.byte_iter().collect()))
}

/// Decode a stealth address and check it belongs to `network`.
///
/// The prefix is checked before the key length, so a foreign-network
/// address always reports [`AddressError::WrongNetwork`].
pub fn decode_stealth(address: &str, network: &CoinNetwork) -> Result<StealthAddress, AddressError> {
    let (prefix, payload) = decode_stealth_raw(address)?;

    let expected = network.stealth_prefix.to_ascii_lowercase();
    if prefix != expected {
        return Err(AddressError::WrongNetwork { found: prefix, expected });
    }

    let key: [u8; STEALTH_PUBKEY_LEN] = payload
        .as_slice()
        .try_into()
        .map_err(|_| AddressError::InvalidKeyLength(payload.len()))?;

    Ok(StealthAddress {
        prefix,
        pubkey: StealthPubKey(key),
    })
}

/// Encode raw key bytes as a stealth address with the given prefix.
///
/// No length check: the wallet only ever passes 33-byte keys, and tests
/// need to produce malformed ones.
pub fn encode_stealth(key: &[u8], prefix: &str) -> Result<String, AddressError> {
    let hrp = parse_hrp(prefix)?;
    bech32::encode::<Bech32>(hrp, key).map_err(|e| AddressError::Encode(e.to_string()))
}

fn parse_hrp(s: &str) -> Result<Hrp, AddressError> {
    Hrp::parse(s).map_err(|e| AddressError::Encode(e.to_string()))
}

fn check_prefix(hrp: &Hrp, expected: &str) -> Result<(), AddressError> {
    let found = hrp.to_lowercase();
    let expected = expected.to_ascii_lowercase();
    if found != expected {
        return Err(AddressError::WrongNetwork { found, expected });
    }
    Ok(())
}
