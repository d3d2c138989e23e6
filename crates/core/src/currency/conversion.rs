//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for converted amounts:
//! - Always round to `CONVERTED_DECIMAL_PLACES`
//! - Use banker's rounding (round half to even)
//! - Store both original and converted amounts

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::currency::converter::ConversionError;

/// Decimal places kept for amounts in the company default currency.
pub const CONVERTED_DECIMAL_PLACES: u32 = 2;

/// Rounds an amount to `decimal_places` with banker's rounding.
#[must_use]
pub fn round_amount(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
///
/// # Errors
///
/// Returns `ConversionError::Overflow` if the product does not fit a `Decimal`.
pub fn convert_amount(
    amount: Decimal,
    rate: Decimal,
    decimal_places: u32,
) -> Result<Decimal, ConversionError> {
    amount
        .checked_mul(rate)
        .map(|converted| round_amount(converted, decimal_places))
        .ok_or(ConversionError::Overflow)
}
