//! Royalty processing.
//!
//! Royalties are the treasury-designated cut split out of each award.
//! They are paid per record, not aggregated, to the treasury's royalty
//! address, after the main pass. A treasury that already failed
//! structurally in this run is skipped entirely — its royalty records
//! stay Pending rather than repeating a known-bad configuration.

use crate::{
    connector::ChainProvider,
    engine::RunContext,
    error::{PayoutError, PayoutResult},
    evm_payout::submit_evm,
    progress::{ProgressSink, RunSummary},
    record::PendingRoyalty,
    secret::SecretDecryptor,
    store::PayoutStore,
    substrate_payout::{submit_substrate, SubmitResult},
    types::ChainFamily,
};

pub struct RoyaltyProcessor<'a> {
    pub store: &'a PayoutStore,
    pub provider: &'a dyn ChainProvider,
    pub decryptor: &'a dyn SecretDecryptor,
}

impl RoyaltyProcessor<'_> {
    /// Process every pending royalty record, mirroring the main pass's
    /// classification, persistence, and fail-fast behavior on the
    /// royalty-prefixed columns.
    pub fn process(
        &self,
        ctx: &mut RunContext,
        royalties: &[PendingRoyalty],
        progress: &mut dyn ProgressSink,
        summary: &mut RunSummary,
    ) -> PayoutResult<()> {
        log::info!("Handling {} royalties", royalties.len());

        for royalty in royalties {
            if ctx.failed_treasuries.contains(&royalty.treasury_id) {
                summary.royalties_skipped += 1;
                continue;
            }

            match self.submit(ctx, royalty) {
                Ok(result) => {
                    let now = chrono::Utc::now().timestamp();
                    self.store.mark_royalty_submitted(
                        royalty.id,
                        &result.tx_hash,
                        now,
                        result.min_balance_bumped,
                        result.sent_existential_deposit,
                    )?;
                    summary.royalties_submitted += 1;
                    log::info!(
                        "Royalty transaction for award {} submitted: {}",
                        royalty.id,
                        result.tx_hash
                    );
                }
                Err(e) => {
                    let status = e.status_code();
                    self.store.mark_royalty_failed(royalty.id, status)?;
                    summary.royalties_failed += 1;
                    log::error!("Error processing royalty for award {}: {e}", royalty.id);

                    if status.halts_treasury() {
                        log::warn!(
                            "Skipping remaining payouts for treasury '{}'",
                            royalty.treasury.name
                        );
                        ctx.failed_treasuries.insert(royalty.treasury_id);
                    }
                }
            }

            ctx.current += 1;
            progress.processing(ctx.current, ctx.total);
        }

        Ok(())
    }

    fn submit(&self, ctx: &RunContext, royalty: &PendingRoyalty) -> PayoutResult<SubmitResult> {
        let treasury = &royalty.treasury;
        let receiver = treasury
            .royalty_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                PayoutError::Chain(format!(
                    "Treasury '{}' has royalties without a royalty address",
                    treasury.name
                ))
            })?;

        match treasury.family {
            ChainFamily::Substrate => submit_substrate(
                self.store,
                self.provider,
                self.decryptor,
                &ctx.encryption_key,
                treasury,
                royalty.user_id,
                receiver,
                &royalty.royalty_value,
            ),
            ChainFamily::Evm => submit_evm(
                self.provider,
                self.decryptor,
                &ctx.encryption_key,
                treasury,
                receiver,
                &royalty.royalty_value,
            )
            .map(|tx_hash| SubmitResult {
                tx_hash,
                min_balance_bumped: false,
                sent_existential_deposit: false,
            }),
        }
    }
}
