//! Amount verification between a source transaction and its bridge claim
//!
//! The bridge credits every coin in 18-decimal units, while source chains
//! carry their native decimals (8 for BTC, 6 for USDT, ...). A claim is only
//! signed when the source transaction moves exactly the requested amount.
//!
//! # Matching Rule
//!
//! Both sides are scaled to 18-decimal units and compared as exact decimal
//! digit strings. Scaling absorbs the difference in native decimals, so an
//! 8-decimal `1.5` and an 18-decimal `1.5` render the same digits while
//! `0.15` (`150000000000000000`) never equals `1.5` (`1500000000000000000`).

use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::types::SourceTransaction;

/// Decimals of every amount the bridge records
pub const BRIDGE_DECIMALS: u8 = 18;

/// Convert a whole-coin amount into 18-decimal bridge units
///
/// Fails for negative amounts and for amounts with more than 18 decimals.
pub fn to_bridge_units(amount: &BigDecimal) -> Result<U256> {
    let scaled = amount * BigDecimal::from(1_000_000_000_000_000_000u64);
    let integral = scaled.with_scale(0);
    if integral != scaled {
        return Err(BridgeError::InvalidInput(format!(
            "{} has more than {} decimals",
            amount, BRIDGE_DECIMALS
        )));
    }
    let (digits, _) = integral.as_bigint_and_exponent();
    if digits.sign() == Sign::Minus {
        return Err(BridgeError::InvalidInput(format!(
            "negative amount {}",
            amount
        )));
    }
    U256::from_str_radix(&digits.to_string(), 10)
        .map_err(|e| BridgeError::InvalidInput(format!("amount {} out of range: {}", amount, e)))
}

/// Convert 18-decimal bridge units back into a whole-coin amount
pub fn from_bridge_units(units: U256) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &units.to_be_bytes::<32>());
    BigDecimal::new(digits, BRIDGE_DECIMALS as i64).normalized()
}

/// Rescale a native-decimal integer amount to 18-decimal bridge units
pub fn scale_to_bridge_units(amount: U256, decimals: u8) -> Result<U256> {
    let ten = U256::from(10u64);
    if decimals <= BRIDGE_DECIMALS {
        let factor = ten.pow(U256::from(BRIDGE_DECIMALS - decimals));
        return amount.checked_mul(factor).ok_or_else(|| {
            BridgeError::InvalidInput(format!("amount {} overflows bridge units", amount))
        });
    }
    let divisor = ten.pow(U256::from(decimals - BRIDGE_DECIMALS));
    if amount % divisor != U256::ZERO {
        return Err(BridgeError::InvalidInput(format!(
            "amount {} with {} decimals is not representable in bridge units",
            amount, decimals
        )));
    }
    Ok(amount / divisor)
}

/// Compare two decimal strings of bridge units
pub fn amounts_match(requested: &str, in_tx: &str) -> bool {
    !in_tx.is_empty() && requested == in_tx
}

/// Verify the source transaction carries the requested amount
///
/// Returns the requested amount in bridge units on success.
pub fn verify_amount(requested: &BigDecimal, tx: &SourceTransaction) -> Result<U256> {
    let requested_units = to_bridge_units(requested)?;
    let tx_units = scale_to_bridge_units(tx.amount_in_tx, tx.amount_decimals)?;

    let requested_str = requested_units.to_string();
    let tx_str = tx_units.to_string();
    debug!(
        requested = %requested_str,
        in_tx = %tx_str,
        tx_hash = %tx.tx_hash,
        "Comparing deposit amounts"
    );

    if !amounts_match(&requested_str, &tx_str) {
        return Err(BridgeError::AmountMismatch {
            requested: requested_str,
            in_tx: tx_str,
        });
    }
    Ok(requested_units)
}
