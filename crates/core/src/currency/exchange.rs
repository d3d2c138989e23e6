//! Exchange rate types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use claimflow_shared::types::CurrencyCode;

/// Exchange rate between two currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
    /// 1 `from` = `rate` `to`.
    pub rate: Decimal,
    /// When the rate was obtained.
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub const fn new(
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            rate,
            fetched_at,
        }
    }

    /// Returns the inverse rate, or `None` for a zero rate.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        Decimal::ONE.checked_div(self.rate).map(|rate| Self {
            from: self.to,
            to: self.from,
            rate,
            fetched_at: self.fetched_at,
        })
    }
}
