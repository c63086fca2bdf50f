//! The payout orchestrator — the heart of the engine.
//!
//! RULES:
//!   - One treasury per run; aggregates execute strictly sequentially,
//!     because each submission depends on the wallet balance left by
//!     the previous one.
//!   - The orchestrator is the only writer of award status; submission
//!     procedures communicate failure by error, never by writing.
//!   - A submission failure is isolated to its aggregate. A structural
//!     failure (any status other than GeneralError) additionally halts
//!     the rest of that treasury's run.
//!   - All run state lives in an explicit RunContext. Concurrent runs
//!     for different treasuries cannot interfere.

use crate::{
    aggregate::{aggregate_awards, AggregatedPayout},
    connector::ChainProvider,
    error::PayoutResult,
    evm_payout::submit_evm,
    progress::{ProgressSink, RunSummary},
    royalty::RoyaltyProcessor,
    secret::SecretDecryptor,
    store::PayoutStore,
    substrate_payout::{submit_substrate, SubmitResult},
    types::{ChainFamily, StatusCode, TreasuryId},
};
use std::collections::HashSet;

/// Mutable state scoped to exactly one run.
pub struct RunContext {
    /// Key supplied by the operator; decrypts wallet secrets in memory
    /// only, discarded when the context drops.
    pub encryption_key: String,
    /// Treasuries that hit a structural failure this run. Their
    /// remaining aggregates and royalties are skipped, left Pending.
    pub failed_treasuries: HashSet<TreasuryId>,
    /// Records processed so far (main + royalty).
    pub current: usize,
    /// Records expected this run (main + royalty).
    pub total: usize,
}

pub struct PayoutEngine<'a> {
    store: &'a PayoutStore,
    provider: &'a dyn ChainProvider,
    decryptor: &'a dyn SecretDecryptor,
}

impl<'a> PayoutEngine<'a> {
    pub fn new(
        store: &'a PayoutStore,
        provider: &'a dyn ChainProvider,
        decryptor: &'a dyn SecretDecryptor,
    ) -> Self {
        Self {
            store,
            provider,
            decryptor,
        }
    }

    /// Process one treasury's pending awards and royalties to a
    /// terminal per-call state.
    ///
    /// Safe to re-run: the selection query excludes every record whose
    /// transaction hash is already set, so nothing is ever paid twice.
    /// Only database errors propagate; submission failures are
    /// classified and persisted per aggregate.
    pub fn run(
        &self,
        progress: &mut dyn ProgressSink,
        encryption_key: &str,
        treasury_id: TreasuryId,
    ) -> PayoutResult<RunSummary> {
        let pending = self.store.pending_awards(treasury_id)?;
        let royalties = self.store.pending_royalties(treasury_id)?;
        let aggregates = aggregate_awards(&pending);

        let mut ctx = RunContext {
            encryption_key: encryption_key.to_string(),
            failed_treasuries: HashSet::new(),
            current: 0,
            total: pending.len() + royalties.len(),
        };
        let mut summary = RunSummary::default();

        log::info!(
            "Payout run for treasury {treasury_id}: {} awards in {} aggregates, {} royalties",
            pending.len(),
            aggregates.len(),
            royalties.len()
        );

        for aggregate in &aggregates {
            self.process_aggregate(&mut ctx, aggregate, progress, &mut summary)?;
        }

        RoyaltyProcessor {
            store: self.store,
            provider: self.provider,
            decryptor: self.decryptor,
        }
        .process(&mut ctx, &royalties, progress, &mut summary)?;

        progress.processed();
        Ok(summary)
    }

    fn process_aggregate(
        &self,
        ctx: &mut RunContext,
        aggregate: &AggregatedPayout,
        progress: &mut dyn ProgressSink,
        summary: &mut RunSummary,
    ) -> PayoutResult<()> {
        let records = aggregate.record_ids.len();

        if ctx.failed_treasuries.contains(&aggregate.treasury_id) {
            summary.skipped += records;
            self.advance(ctx, records, progress);
            return Ok(());
        }

        // Receiver resolution happens before any chain call; a missing
        // address is a terminal status of its own, not a submission
        // failure.
        let receiver = match aggregate.treasury.family {
            ChainFamily::Substrate => aggregate.substrate_address.as_deref(),
            ChainFamily::Evm => aggregate.evm_address.as_deref(),
        }
        .filter(|a| !a.is_empty());

        let Some(receiver) = receiver else {
            log::warn!(
                "Skipping payout for user {} on treasury {}: no {} address",
                aggregate.user_id,
                aggregate.treasury_id,
                aggregate.treasury.family.as_str()
            );
            self.store
                .mark_failed(&aggregate.record_ids, StatusCode::NoReceiverAddress)?;
            summary.failed += records;
            self.advance(ctx, records, progress);
            return Ok(());
        };

        match self.submit(ctx, aggregate, receiver) {
            Ok(result) => {
                let now = chrono::Utc::now().timestamp();
                self.store.mark_submitted(
                    &aggregate.record_ids,
                    &result.tx_hash,
                    now,
                    result.min_balance_bumped,
                    result.sent_existential_deposit,
                )?;
                summary.submitted += records;
                log::info!(
                    "Transfer for user {} on treasury {} submitted: {}",
                    aggregate.user_id,
                    aggregate.treasury_id,
                    result.tx_hash
                );
            }
            Err(e) => {
                let status = e.status_code();
                self.store.mark_failed(&aggregate.record_ids, status)?;
                summary.failed += records;
                log::error!(
                    "Error processing payout for user {} on treasury {}: {e}",
                    aggregate.user_id,
                    aggregate.treasury_id
                );

                if status.halts_treasury() {
                    log::warn!(
                        "Skipping remaining payouts for treasury '{}'",
                        aggregate.treasury.name
                    );
                    ctx.failed_treasuries.insert(aggregate.treasury_id);
                }
            }
        }

        self.advance(ctx, records, progress);
        Ok(())
    }

    fn submit(
        &self,
        ctx: &RunContext,
        aggregate: &AggregatedPayout,
        receiver: &str,
    ) -> PayoutResult<SubmitResult> {
        // The royalty portion is paid separately, per record, by the
        // royalty processor; the main transfer sends the remainder.
        let value = aggregate.net_value();

        match aggregate.treasury.family {
            ChainFamily::Substrate => submit_substrate(
                self.store,
                self.provider,
                self.decryptor,
                &ctx.encryption_key,
                &aggregate.treasury,
                aggregate.user_id,
                receiver,
                &value,
            ),
            ChainFamily::Evm => submit_evm(
                self.provider,
                self.decryptor,
                &ctx.encryption_key,
                &aggregate.treasury,
                receiver,
                &value,
            )
            .map(|tx_hash| SubmitResult {
                tx_hash,
                min_balance_bumped: false,
                sent_existential_deposit: false,
            }),
        }
    }

    fn advance(&self, ctx: &mut RunContext, records: usize, progress: &mut dyn ProgressSink) {
        ctx.current += records;
        progress.processing(ctx.current, ctx.total);
    }
}
