//! Hashing utilities for Keystone

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{CryptoError, CryptoResult};

/// Compute SHA-256 hash of data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Encode fields for signing, each preceded by its big-endian `u64` length,
/// so two different field lists never produce the same bytes
pub fn encode_fields<I, F>(fields: I) -> Vec<u8>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for field in fields {
        let field = field.as_ref();
        out.extend_from_slice(&(field.len() as u64).to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Canonical JSON bytes of a value
///
/// Struct fields serialize in declaration order and the model uses ordered
/// collections, so equal values always produce equal bytes.
pub fn canonical_json<T: Serialize>(value: &T) -> CryptoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Hash a JSON-serializable value
pub fn hash_json<T: Serialize>(value: &T) -> CryptoResult<String> {
    Ok(sha256_hex(&canonical_json(value)?))
}
