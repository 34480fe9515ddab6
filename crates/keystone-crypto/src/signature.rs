//! Digital signatures for Keystone artifacts

use crate::{CryptoError, CryptoResult, KeyPair, PublicKey};
use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier};
use serde::{Deserialize, Serialize};

/// A digital signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Hex-encoded signature bytes
    pub signature: String,
    /// Public key of the signer
    pub public_key: PublicKey,
}

impl Signature {
    /// Sign a message
    pub fn sign(keypair: &KeyPair, message: &[u8]) -> CryptoResult<Self> {
        let signature = keypair
            .signing_key()
            .try_sign(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        Ok(Self {
            signature: hex::encode(signature.to_bytes()),
            public_key: PublicKey::from_keypair(keypair),
        })
    }

    /// Verify the signature
    ///
    /// `Ok(false)` means well-formed but not matching; `Err` means the
    /// signature or key could not even be decoded.
    pub fn verify(&self, message: &[u8]) -> CryptoResult<bool> {
        let sig_array: [u8; 64] = hex::decode(&self.signature)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))?
            .try_into()
            .map_err(|_| CryptoError::VerificationFailed("Signature must be 64 bytes".to_string()))?;

        let signature = Ed25519Signature::from_bytes(&sig_array);
        let verifying_key = self.public_key.to_verifying_key()?;

        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    /// Whether this signature was produced by the given key
    pub fn is_from(&self, public_key: &PublicKey) -> bool {
        &self.public_key == public_key
    }
}

/// Signable trait for types that can be signed
pub trait Signable {
    /// Get the bytes to sign
    fn signable_bytes(&self) -> Vec<u8>;
}

/// Sign any Signable type
pub fn sign<T: Signable>(keypair: &KeyPair, item: &T) -> CryptoResult<Signature> {
    Signature::sign(keypair, &item.signable_bytes())
}

/// Verify signature on any Signable type
pub fn verify<T: Signable>(signature: &Signature, item: &T) -> CryptoResult<bool> {
    signature.verify(&item.signable_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"plan:abc";

        let signature = Signature::sign(&keypair, message).unwrap();
        assert!(signature.verify(message).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = KeyPair::from_bytes(&[7; 32]);
        let a = Signature::sign(&keypair, b"same").unwrap();
        let b = Signature::sign(&keypair, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = KeyPair::generate();
        let signature = Signature::sign(&keypair, b"plan:abc").unwrap();
        assert!(!signature.verify(b"plan:abd").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();
        let message = b"plan:abc";

        let signature = Signature::sign(&keypair1, message).unwrap();
        let tampered = Signature {
            public_key: PublicKey::from_keypair(&keypair2),
            ..signature
        };

        assert!(!tampered.verify(message).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let keypair = KeyPair::generate();
        let mut signature = Signature::sign(&keypair, b"x").unwrap();
        signature.signature = "zz".to_string();
        assert!(signature.verify(b"x").is_err());
    }
}
