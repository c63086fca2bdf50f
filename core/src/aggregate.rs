//! Award aggregation.
//!
//! Many small awards for the same recipient from the same treasury are
//! paid with one on-chain transfer. Aggregation is pure: it sums values,
//! collects source record ids in selection order, and snapshots the
//! treasury fields the submission procedures need.

use crate::record::{PendingAward, Treasury};
use crate::types::{RecordId, TreasuryId, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The summed, multi-record payout unit for one (recipient, treasury)
/// pair. Built at the start of a run, never persisted.
#[derive(Debug, Clone)]
pub struct AggregatedPayout {
    pub user_id: UserId,
    pub treasury_id: TreasuryId,
    /// Source award ids, in timestamp-ascending selection order.
    pub record_ids: Vec<RecordId>,
    /// Exact sum of member values.
    pub value: Decimal,
    /// Exact sum of member royalty values; paid separately.
    pub royalty_value: Decimal,
    pub evm_address: Option<String>,
    pub substrate_address: Option<String>,
    pub treasury: Treasury,
}

impl AggregatedPayout {
    /// The amount the main transfer actually sends: the total minus the
    /// royalty portion, which the royalty processor pays on its own.
    pub fn net_value(&self) -> Decimal {
        self.value - self.royalty_value
    }
}

/// Group pending awards by (recipient, treasury), preserving the order
/// in which each pair was first seen.
pub fn aggregate_awards(pending: &[PendingAward]) -> Vec<AggregatedPayout> {
    let mut aggregates: Vec<AggregatedPayout> = Vec::new();
    let mut index: HashMap<(UserId, TreasuryId), usize> = HashMap::new();

    for award in pending {
        let key = (award.user_id, award.treasury_id);
        match index.get(&key) {
            Some(&i) => {
                let agg = &mut aggregates[i];
                agg.value += award.value;
                agg.royalty_value += award.royalty_value.unwrap_or_default();
                agg.record_ids.push(award.id);
            }
            None => {
                index.insert(key, aggregates.len());
                aggregates.push(AggregatedPayout {
                    user_id: award.user_id,
                    treasury_id: award.treasury_id,
                    record_ids: vec![award.id],
                    value: award.value,
                    royalty_value: award.royalty_value.unwrap_or_default(),
                    evm_address: award.evm_address.clone(),
                    substrate_address: award.substrate_address.clone(),
                    treasury: award.treasury.clone(),
                });
            }
        }
        log::debug!(
            "Aggregating award {} into group ({}, {})",
            award.id,
            award.user_id,
            award.treasury_id
        );
    }

    aggregates
}
