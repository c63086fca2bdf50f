//! Row types read from the payout database.
//!
//! A pending award is the join of an award row with the recipient's
//! addresses and the full treasury configuration, exactly the shape the
//! selection query produces. Treasuries are immutable for the duration
//! of a run; the engine only ever reads them.

use crate::types::{ChainFamily, RecordId, TreasuryId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-chain submission options stored as JSON on the treasury row.
/// Some chains need custom type definitions or a nonzero tip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainOptions {
    #[serde(default)]
    pub types: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub options: SubmitOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitOptions {
    #[serde(default)]
    pub tip: u64,
}

impl ChainOptions {
    /// Parse the raw column value. A malformed column is logged and
    /// degrades to defaults (no type overrides, zero tip) rather than
    /// failing the whole treasury.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ChainOptions::default();
        };
        if raw.is_empty() || raw == "null" {
            return ChainOptions::default();
        }
        match serde_json::from_str(raw) {
            Ok(opts) => opts,
            Err(e) => {
                log::error!("Malformed chain_options column, using defaults: {e}");
                ChainOptions::default()
            }
        }
    }
}

/// A configured payout wallet plus its chain, token, and policy settings.
#[derive(Debug, Clone)]
pub struct Treasury {
    pub id: TreasuryId,
    pub name: String,
    pub family: ChainFamily,
    pub coin_name: String,
    pub rpc_url: String,
    /// Encrypted at rest; decrypted only in memory, only for one run.
    pub wallet_secret: String,
    pub chain_prefix: u16,
    pub chain_options: Option<String>,
    pub is_native: bool,
    pub token_address: Option<String>,
    pub token_decimals: u32,
    /// Present for substrate asset-pallet tokens; absent for the
    /// chain's native token.
    pub asset_id: Option<u32>,
    pub royalty_enabled: bool,
    pub royalty_address: Option<String>,
    pub royalty_percentage: Option<f64>,
    pub send_min_balance: bool,
    pub send_existential_deposit: bool,
}

impl Treasury {
    pub fn options(&self) -> ChainOptions {
        ChainOptions::parse(self.chain_options.as_deref())
    }
}

/// One unpaid award joined with its recipient and treasury.
#[derive(Debug, Clone)]
pub struct PendingAward {
    pub id: RecordId,
    pub user_id: UserId,
    pub treasury_id: TreasuryId,
    pub value: Decimal,
    pub royalty_value: Option<Decimal>,
    pub evm_address: Option<String>,
    pub substrate_address: Option<String>,
    pub created_at: i64,
    pub treasury: Treasury,
}

/// One award whose royalty portion has not yet been paid out.
/// Royalties go to the treasury's royalty address, so no user join.
#[derive(Debug, Clone)]
pub struct PendingRoyalty {
    pub id: RecordId,
    pub user_id: UserId,
    pub treasury_id: TreasuryId,
    pub royalty_value: Decimal,
    pub treasury: Treasury,
}
