//! Substrate-family submission procedure.
//!
//! A single payout is a short sequence of dependent chain calls:
//! connect, read metadata, optionally top up the receiver's existential
//! deposit, then transfer either the native token or an asset-pallet
//! asset. Every step may fail; nothing is retried within the call.
//! Balance checks always reserve the configured tip.

use crate::{
    amount::convert_amount,
    connector::{ChainProvider, SubmitOutcome, TerminalStatus},
    error::{PayoutError, PayoutResult},
    record::Treasury,
    secret::SecretDecryptor,
    store::PayoutStore,
    types::UserId,
};
use num_bigint::BigUint;
use rust_decimal::Decimal;

/// What a successful submission hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub tx_hash: String,
    pub min_balance_bumped: bool,
    pub sent_existential_deposit: bool,
}

/// Submit one transfer of `value` from the treasury wallet to
/// `receiver` on a substrate chain.
///
/// `user_id` keys the at-most-once existential-deposit bookkeeping;
/// the check runs against the durable store before any top-up is sent.
#[allow(clippy::too_many_arguments)]
pub fn submit_substrate(
    store: &PayoutStore,
    provider: &dyn ChainProvider,
    decryptor: &dyn SecretDecryptor,
    encryption_key: &str,
    treasury: &Treasury,
    user_id: UserId,
    receiver: &str,
    value: &Decimal,
) -> PayoutResult<SubmitResult> {
    let options = treasury.options();
    let tip = options.options.tip;

    let chain = provider.connect_substrate(&treasury.rpc_url, &options)?;
    let secret = decryptor.decrypt(&treasury.wallet_secret, encryption_key)?;
    let signer = chain.derive_address(&secret)?;
    let meta = chain.metadata()?;
    let receiver = chain.encode_address(receiver, treasury.chain_prefix)?;

    let mut sent_existential_deposit = false;
    let mut min_balance_bumped = false;

    if treasury.send_existential_deposit
        && !store.existential_deposit_exists(user_id, treasury.chain_prefix)?
    {
        let deposit = &meta.existential_deposit;
        let receiver_balance = chain.free_balance(&receiver)?;
        let account_balance = chain.free_balance(&signer)?;

        if *deposit > receiver_balance {
            sent_existential_deposit = true;
            if *deposit >= spendable(&account_balance, tip) {
                return Err(PayoutError::InsufficientBalance);
            }

            let outcome = chain.submit_native_transfer(&secret, &receiver, deposit, tip)?;
            let tx_hash = require_included(outcome, "Existential Deposit Transaction")?;
            store.insert_existential_deposit(user_id, treasury.chain_prefix, &tx_hash)?;
            log::info!(
                "Existential deposit for user {user_id} on prefix {} submitted: {tx_hash}",
                treasury.chain_prefix
            );
        }
    }

    match treasury.asset_id {
        None => {
            // Native token.
            let amount = convert_amount(value, meta.token_decimals)?;
            let account_balance = chain.free_balance(&signer)?;
            if amount >= spendable(&account_balance, tip) {
                return Err(PayoutError::InsufficientBalance);
            }

            let outcome = chain.submit_native_transfer(&secret, &receiver, &amount, tip)?;
            let tx_hash = require_included(outcome, "Transaction")?;
            Ok(SubmitResult {
                tx_hash,
                min_balance_bumped,
                sent_existential_deposit,
            })
        }
        Some(asset_id) => {
            let asset = chain.asset_metadata(asset_id)?;
            let mut amount = convert_amount(value, asset.decimals)?;

            let receiver_asset_balance = chain.asset_balance(asset_id, &receiver)?;
            let account_asset_balance = chain.asset_balance(asset_id, &signer)?;

            // The chain refuses transfers that would leave the receiver
            // below the asset's minimum balance. When the policy is on,
            // bump small amounts up to that minimum.
            if treasury.send_min_balance
                && asset.min_balance > receiver_asset_balance
                && amount <= asset.min_balance
            {
                min_balance_bumped = true;
                amount = asset.min_balance.clone();
            }

            if amount >= account_asset_balance {
                return Err(PayoutError::InsufficientAssetBalance);
            }

            let outcome =
                chain.submit_asset_transfer(&secret, asset_id, &receiver, &amount, tip)?;
            let tx_hash = require_included(outcome, "Asset Transaction")?;
            Ok(SubmitResult {
                tx_hash,
                min_balance_bumped,
                sent_existential_deposit,
            })
        }
    }
}

/// Balance available for spending once the tip is reserved.
fn spendable(balance: &BigUint, tip: u64) -> BigUint {
    let tip = BigUint::from(tip);
    if *balance >= tip {
        balance - &tip
    } else {
        BigUint::default()
    }
}

/// Turn a terminal submission outcome into a transaction hash, or a
/// chain error naming the step and what the chain reported.
fn require_included(outcome: SubmitOutcome, what: &str) -> PayoutResult<String> {
    match outcome.status {
        TerminalStatus::InBlock | TerminalStatus::Finalized => {
            if let Some(err) = outcome.dispatch_error {
                return Err(PayoutError::Chain(format!(
                    "Substrate {what} failed: {err}"
                )));
            }
            outcome.tx_hash.ok_or_else(|| {
                PayoutError::Chain(format!("Substrate {what} included without a hash"))
            })
        }
        status => Err(PayoutError::Chain(format!(
            "Substrate {what} failed: transaction {}",
            status.as_str()
        ))),
    }
}
