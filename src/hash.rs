//! Hash helpers for burn commitments and proof nodes
//!
//! Proof nodes are SHA-256 digests; every hash crosses the wire as a
//! `0x`-prefixed lowercase hex string.

use alloy::primitives::B256;
use sha2::{Digest, Sha256};

use crate::error::PorterError;

/// Compute the SHA-256 digest of data
pub fn sha256(data: &[u8]) -> B256 {
    let digest = Sha256::digest(data);
    B256::from_slice(&digest)
}

/// Hash two child nodes into their parent (`sha256(left || right)`)
pub fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(left.as_slice());
    hasher.update(right.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Convert a 32-byte hash to hex string with 0x prefix
pub fn bytes32_to_hex(bytes: &B256) -> String {
    format!("0x{}", hex::encode(bytes.as_slice()))
}

/// Parse a 32-byte hash from hex (with or without 0x prefix)
pub fn parse_bytes32(input: &str) -> Result<B256, PorterError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    let raw = hex::decode(digits).map_err(|e| PorterError::malformed(input, e.to_string()))?;
    if raw.len() != 32 {
        return Err(PorterError::malformed(
            input,
            format!("expected 32 bytes, got {}", raw.len()),
        ));
    }
    Ok(B256::from_slice(&raw))
}
