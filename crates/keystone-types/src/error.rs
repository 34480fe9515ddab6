//! Error types shared across Keystone crates

use thiserror::Error;

/// Result type for Keystone type-level operations
pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Keystone error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeystoneError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Amount underflow during arithmetic
    #[error("Amount underflow during arithmetic operation")]
    AmountUnderflow,

    // ========================================================================
    // Input Errors
    // ========================================================================

    /// Malformed input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Serialization failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl KeystoneError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AmountUnderflow => "AMOUNT_UNDERFLOW",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for KeystoneError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(KeystoneError::AmountOverflow.error_code(), "AMOUNT_OVERFLOW");
        assert_eq!(KeystoneError::invalid_input("x").error_code(), "INVALID_INPUT");
    }
}
