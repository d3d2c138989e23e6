//! Currency conversion for expense submission.
//!
//! Expenses are stored in the currency they were entered in and, alongside,
//! in the company default currency. Rates come from a [`CurrencyConverter`].

pub mod conversion;
pub mod converter;
pub mod exchange;

pub use conversion::{CONVERTED_DECIMAL_PLACES, convert_amount, round_amount};
pub use converter::{ConversionError, CurrencyConverter, FixedRateConverter};
pub use exchange::ExchangeRate;
