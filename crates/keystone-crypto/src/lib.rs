//! Keystone Crypto - Hashing and signing for authorization artifacts
//!
//! This crate provides:
//! - Key generation (Ed25519)
//! - Digital signatures over tokens and attestations
//! - Hashing (SHA-256) of canonical JSON for plan binding
//!
//! # Security Invariant
//!
//! **Signing keys never leave the component that owns them.** The kernel and
//! the gateway each hold their own [`KeyPair`]; only public keys are exported.

pub mod keys;
pub mod signature;
pub mod hash;

pub use keys::*;
pub use signature::*;
pub use hash::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Canonical encoding failed: {0}")]
    Encoding(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
