//! EVM-family submission procedure.
//!
//! Two branches: a plain value transfer for the chain's native coin, or
//! an encoded `transfer` call for contract tokens. The connector owns
//! gas estimation and pricing. EVM chains have no existential-deposit
//! or min-balance policy; every shortfall is InsufficientBalance.

use crate::{
    amount::convert_amount,
    connector::ChainProvider,
    error::{PayoutError, PayoutResult},
    record::Treasury,
    secret::SecretDecryptor,
};
use rust_decimal::Decimal;

/// Submit one transfer of `value` from the treasury wallet to
/// `receiver` on an EVM chain. Returns the receipt's transaction hash.
pub fn submit_evm(
    provider: &dyn ChainProvider,
    decryptor: &dyn SecretDecryptor,
    encryption_key: &str,
    treasury: &Treasury,
    receiver: &str,
    value: &Decimal,
) -> PayoutResult<String> {
    let chain = provider.connect_evm(&treasury.rpc_url)?;
    let private_key = decryptor.decrypt(&treasury.wallet_secret, encryption_key)?;
    let signer = chain.derive_address(&private_key)?;

    let amount = convert_amount(value, treasury.token_decimals)?;

    if treasury.is_native {
        let balance = chain.native_balance(&signer)?;
        if amount >= balance {
            return Err(PayoutError::InsufficientBalance);
        }
        chain.submit_native_transfer(&private_key, receiver, &amount)
    } else {
        let token = treasury.token_address.as_deref().ok_or_else(|| {
            PayoutError::Chain(format!(
                "Treasury '{}' is a token treasury without a token address",
                treasury.name
            ))
        })?;
        let balance = chain.token_balance(token, &signer)?;
        if amount >= balance {
            return Err(PayoutError::InsufficientBalance);
        }
        chain.submit_token_transfer(&private_key, token, receiver, &amount)
    }
}
