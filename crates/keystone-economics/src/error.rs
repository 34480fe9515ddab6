//! Governor errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("Invalid spend amount: {0}")]
    InvalidAmount(String),

    #[error("Ledger persistence failed: {0}")]
    Persistence(String),

    #[error("Ledger is corrupt: {0}")]
    Corrupt(String),

    #[error("Unsupported ledger version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, GovernorError>;

impl From<std::io::Error> for GovernorError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for GovernorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}
