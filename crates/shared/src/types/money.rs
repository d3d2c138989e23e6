//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An ISO 4217 style currency code (three ASCII letters, stored upper-cased).
///
/// Companies pick their own default currency and employees may submit in any
/// currency, so this is an open set rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// US Dollar.
    pub const USD: Self = Self(*b"USD");
    /// Euro.
    pub const EUR: Self = Self(*b"EUR");

    /// Parses a currency code, accepting any letter case.
    ///
    /// # Errors
    ///
    /// Returns a message when the input is not exactly three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, String> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [a, b, c] if bytes.iter().all(u8::is_ascii_alphabetic) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(format!("Invalid currency code: {s:?}")),
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g. dollars, not cents).
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("USD", "USD")]
    #[case("eur", "EUR")]
    #[case(" idr ", "IDR")]
    fn test_currency_parse_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(CurrencyCode::parse(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("US")]
    #[case("USDX")]
    #[case("U5D")]
    #[case("€€€")]
    fn test_currency_parse_rejects(#[case] input: &str) {
        assert!(CurrencyCode::parse(input).is_err());
    }

    #[test]
    fn test_currency_constants() {
        assert_eq!(CurrencyCode::USD.to_string(), "USD");
        assert_eq!(CurrencyCode::EUR, CurrencyCode::parse("eur").unwrap());
    }

    #[test]
    fn test_currency_serde_as_string() {
        let json = serde_json::to_string(&CurrencyCode::EUR).unwrap();
        assert_eq!(json, "\"EUR\"");
        let parsed: CurrencyCode = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(parsed, CurrencyCode::USD);
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }

    #[test]
    fn test_money_is_positive() {
        assert!(Money::new(dec!(0.01), CurrencyCode::USD).is_positive());
        assert!(!Money::new(dec!(0), CurrencyCode::USD).is_positive());
        assert!(!Money::new(dec!(-5), CurrencyCode::USD).is_positive());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(
            Money::new(dec!(250.00), CurrencyCode::USD).to_string(),
            "250.00 USD"
        );
    }
}
