//! Shared primitive types and the payout status taxonomy.

use serde::{Deserialize, Serialize};

/// Database identifier for an award record.
pub type RecordId = i64;

/// Database identifier for a recipient.
pub type UserId = i64;

/// Database identifier for a treasury.
pub type TreasuryId = i64;

/// Which transaction model a treasury's chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Substrate,
    Evm,
}

impl ChainFamily {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "substrate" => Some(ChainFamily::Substrate),
            "evm" => Some(ChainFamily::Evm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Substrate => "substrate",
            ChainFamily::Evm => "evm",
        }
    }
}

/// Terminal per-record outcome of a payout attempt. Shared by the main
/// status column and the royalty status column.
///
/// The integer values are stable and stored in the database; they must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i64)]
pub enum StatusCode {
    Pending = 1,
    Submitted = 2,
    InsufficientBalance = 3,
    GeneralError = 4,
    NoReceiverAddress = 5,
    InsufficientAssetBalance = 6,
    InvalidEncryptionKey = 7,
}

impl StatusCode {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(StatusCode::Pending),
            2 => Some(StatusCode::Submitted),
            3 => Some(StatusCode::InsufficientBalance),
            4 => Some(StatusCode::GeneralError),
            5 => Some(StatusCode::NoReceiverAddress),
            6 => Some(StatusCode::InsufficientAssetBalance),
            7 => Some(StatusCode::InvalidEncryptionKey),
            _ => None,
        }
    }

    /// Structural failures indicate a broken wallet or treasury
    /// configuration and halt the rest of that treasury's run.
    /// GeneralError may be transient and does not.
    pub fn halts_treasury(self) -> bool {
        matches!(
            self,
            StatusCode::InsufficientBalance
                | StatusCode::NoReceiverAddress
                | StatusCode::InsufficientAssetBalance
                | StatusCode::InvalidEncryptionKey
        )
    }
}
