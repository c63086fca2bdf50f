use crate::types::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("Insufficient Balance")]
    InsufficientBalance,

    #[error("Insufficient Asset Balance")]
    InsufficientAssetBalance,

    #[error("Invalid encryption key")]
    InvalidEncryptionKey,

    /// Anything the chain or its connector reports: RPC failures,
    /// dispatch errors, dropped/invalid/usurped/timed-out transactions.
    #[error("{0}")]
    Chain(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid decimal value '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PayoutError {
    /// Map a submission failure onto the stored status taxonomy.
    ///
    /// NoReceiverAddress (5) is assigned by the orchestrator before any
    /// submission is attempted and never appears here.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PayoutError::InsufficientBalance => StatusCode::InsufficientBalance,
            PayoutError::InsufficientAssetBalance => StatusCode::InsufficientAssetBalance,
            PayoutError::InvalidEncryptionKey => StatusCode::InvalidEncryptionKey,
            _ => StatusCode::GeneralError,
        }
    }
}

pub type PayoutResult<T> = Result<T, PayoutError>;
