use thiserror::Error;

/// Engine-wide error types for Shoal.
///
/// Every public operation aborts as a whole on the first error; the variant
/// tells the caller why, so it can retry with corrected inputs or later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShoalError {
    /// Malformed input: zero amounts, out-of-range ratios, zero conversions.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current state (paused, exhausted, already active).
    #[error("Invalid state: {0}")]
    State(String),

    /// An outbound value transfer to a recipient failed.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Caller lacks the governance capability.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Cryptographic error (key decoding, signature verification).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Storage layer error (RocksDB).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ShoalError {
    fn from(e: serde_json::Error) -> Self {
        ShoalError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for ShoalError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        ShoalError::Crypto(e.to_string())
    }
}

impl From<hex::FromHexError> for ShoalError {
    fn from(e: hex::FromHexError) -> Self {
        ShoalError::Validation(format!("invalid hex: {}", e))
    }
}
