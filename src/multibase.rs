//! # Multibase / multicodec fingerprints
//!
//! Ed25519 public keys are carried on the ledger as multibase-encoded
//! fingerprints: a `z`-prefixed base58 (Bitcoin alphabet) string wrapping a
//! 2-byte Ed25519 multicodec header plus the raw 32-byte key.

use ::multibase::Base;

use crate::error::{Error, Result};

/// Multicodec header for Ed25519 public keys (`0xed 0x01`, varint-encoded).
const ED25519_CODEC: [u8; 2] = [0xed, 0x01];

/// Length in bytes of a raw Ed25519 public key.
const ED25519_KEY_LEN: usize = 32;

/// Compute the multibase fingerprint (`z...`) of a raw 32-byte Ed25519
/// public key.
#[must_use]
pub fn fingerprint(public_key: &[u8; ED25519_KEY_LEN]) -> String {
    let mut bytes = Vec::with_capacity(ED25519_CODEC.len() + ED25519_KEY_LEN);
    bytes.extend_from_slice(&ED25519_CODEC);
    bytes.extend_from_slice(public_key);
    ::multibase::encode(Base::Base58Btc, bytes)
}

/// Decode a multibase fingerprint back into a raw 32-byte Ed25519 public
/// key.
///
/// # Errors
///
/// Returns [`Error::validation`] if the string is not `z`-prefixed base58,
/// does not carry the Ed25519 multicodec header, or does not decode to
/// exactly 32 key bytes.
pub fn decode_fingerprint(fp: &str) -> Result<[u8; ED25519_KEY_LEN]> {
    let (base, bytes) =
        ::multibase::decode(fp).map_err(|e| Error::validation(format!("invalid multibase encoding: {e}")))?;
    if base != Base::Base58Btc {
        return Err(Error::validation("fingerprint must use base58btc ('z') multibase encoding"));
    }
    let Some(codec) = bytes.get(..ED25519_CODEC.len()) else {
        return Err(Error::validation("fingerprint is too short to carry a multicodec header"));
    };
    if codec != ED25519_CODEC {
        return Err(Error::validation("fingerprint does not carry the Ed25519 multicodec header"));
    }
    let key_bytes = &bytes[ED25519_CODEC.len()..];
    let key: [u8; ED25519_KEY_LEN] = key_bytes
        .try_into()
        .map_err(|_| Error::validation(format!("expected a {ED25519_KEY_LEN}-byte Ed25519 key")))?;
    Ok(key)
}

/// Compute the fingerprint of a base58btc-encoded (no multibase prefix,
/// no multicodec header) Ed25519 public key, as stored in
/// `publicKeyBase58` fields.
///
/// # Errors
///
/// Returns [`Error::validation`] if `public_key_base58` does not decode to
/// exactly 32 bytes.
pub fn fingerprint_of_base58(public_key_base58: &str) -> Result<String> {
    let raw = bs58::decode(public_key_base58)
        .into_vec()
        .map_err(|e| Error::validation(format!("invalid base58 public key: {e}")))?;
    let key: [u8; ED25519_KEY_LEN] = raw
        .try_into()
        .map_err(|_| Error::validation(format!("expected a {ED25519_KEY_LEN}-byte Ed25519 key")))?;
    Ok(fingerprint(&key))
}
