//! The currency converter port and a fixed-rate implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use claimflow_shared::types::CurrencyCode;

use crate::currency::conversion::{CONVERTED_DECIMAL_PLACES, convert_amount};

/// Errors a converter can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The rate provider failed or answered with something unusable.
    #[error("exchange rate provider unavailable: {0}")]
    Unavailable(String),

    /// The provider did not answer in time.
    #[error("exchange rate lookup timed out after {0} ms")]
    Timeout(u64),

    /// The converted amount does not fit a decimal.
    #[error("converted amount is out of range")]
    Overflow,

    /// The provider has no rate for the pair.
    #[error("no exchange rate from {from} to {to}")]
    UnknownCurrency {
        /// Source currency.
        from: CurrencyCode,
        /// Target currency.
        to: CurrencyCode,
    },
}

/// Converts amounts between currencies at call time.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Converts `amount` from `from` into `to`, rounded to cents.
    async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ConversionError>;
}

/// A converter backed by a fixed rate table.
///
/// Pairs are looked up directly first, then through the inverse of the
/// opposite pair.
#[derive(Debug, Clone, Default)]
pub struct FixedRateConverter {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FixedRateConverter {
    /// Creates an empty converter; every lookup of a foreign pair fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate: 1 `from` = `rate` `to`.
    #[must_use]
    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    fn rate(&self, from: CurrencyCode, to: CurrencyCode) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from, to)).copied().or_else(|| {
            self.rates
                .get(&(to, from))
                .and_then(|inverse| Decimal::ONE.checked_div(*inverse))
        })
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ConversionError> {
        let rate = self
            .rate(from, to)
            .ok_or(ConversionError::UnknownCurrency { from, to })?;
        convert_amount(amount, rate, CONVERTED_DECIMAL_PLACES)
    }
}
