//! Decimal-to-smallest-unit conversion.
//!
//! Chains count in integer smallest units (plancks, wei, asset units)
//! while award values are stored as exact decimals. The conversion is
//! pure string shifting over the canonical decimal representation —
//! binary floating point never enters the path.

use crate::error::{PayoutError, PayoutResult};
use num_bigint::BigUint;
use rust_decimal::Decimal;

/// Convert `value` into the chain's smallest unit for a token with
/// `decimals` fractional digits.
///
/// The fractional part is right-padded with zeros, or truncated toward
/// zero when it carries more digits than the token does. `1.5` at two
/// decimals is 150; `0.001` at two decimals is 0.
pub fn convert_amount(value: &Decimal, decimals: u32) -> PayoutResult<BigUint> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PayoutError::InvalidAmount {
            value: value.to_string(),
            reason: "transfer amounts cannot be negative".into(),
        });
    }

    let text = value.normalize().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.as_str(), ""),
    };

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    let take = decimals as usize;
    digits.push_str(&fraction[..fraction.len().min(take)]);
    for _ in fraction.len()..take {
        digits.push('0');
    }

    digits
        .parse::<BigUint>()
        .map_err(|e| PayoutError::InvalidAmount {
            value: text.clone(),
            reason: e.to_string(),
        })
}
