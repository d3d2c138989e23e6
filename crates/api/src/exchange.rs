//! Exchange-rate converter backed by an HTTP rate API.
//!
//! The provider is queried as `GET {base_url}/{FROM}` and answers with the
//! rates of every currency against `FROM`:
//!
//! ```json
//! { "base": "USD", "rates": { "EUR": 0.9, "GBP": 0.78 } }
//! ```
//!
//! Rates are cached per currency pair for the configured TTL. A fetch for
//! `FROM` also seeds the inverse pairs, so converting back does not need a
//! second request while the entries live.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use claimflow_core::currency::{
    CONVERTED_DECIMAL_PLACES, ConversionError, CurrencyConverter, ExchangeRate, convert_amount,
};
use claimflow_shared::config::ExchangeConfig;
use claimflow_shared::types::CurrencyCode;

/// Maximum number of cached currency pairs.
const CACHE_CAPACITY: u64 = 1_000;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, serde_json::Number>,
}

/// [`CurrencyConverter`] calling an exchangerate-api style endpoint.
#[derive(Clone)]
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
    cache: Cache<(CurrencyCode, CurrencyCode), ExchangeRate>,
}

impl std::fmt::Debug for ExchangeRateApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateApiClient")
            .field("base_url", &self.base_url)
            .field("cached_pairs", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl ExchangeRateApiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ExchangeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn fetch_rates(&self, from: CurrencyCode) -> Result<Vec<ExchangeRate>, ConversionError> {
        let url = format!("{}/{from}", self.base_url);
        debug!(%url, "Fetching exchange rates");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConversionError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConversionError::Unavailable(format!(
                "rate provider answered {}",
                response.status()
            )));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| ConversionError::Unavailable(e.to_string()))?;

        Ok(parse_rates(from, body))
    }

    async fn rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ExchangeRate, ConversionError> {
        if let Some(rate) = self.cache.get(&(from, to)).await {
            return Ok(rate);
        }

        let rates = self.fetch_rates(from).await?;
        let mut found = None;
        for rate in rates {
            if rate.to == to {
                found = Some(rate);
            }
            if let Some(inverse) = rate.inverse()
                && !self.cache.contains_key(&(inverse.from, inverse.to))
            {
                self.cache.insert((inverse.from, inverse.to), inverse).await;
            }
            self.cache.insert((rate.from, rate.to), rate).await;
        }

        found.ok_or(ConversionError::UnknownCurrency { from, to })
    }
}

/// Keeps the rates whose code and value both parse; the rest are skipped.
fn parse_rates(from: CurrencyCode, body: RatesResponse) -> Vec<ExchangeRate> {
    let fetched_at = Utc::now();
    body.rates
        .into_iter()
        .filter_map(|(code, number)| {
            let to = CurrencyCode::parse(&code).ok()?;
            let text = number.to_string();
            match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
                Ok(rate) if rate > Decimal::ZERO => {
                    Some(ExchangeRate::new(from, to, rate, fetched_at))
                }
                _ => {
                    warn!(currency = %to, rate = %text, "Ignoring unusable exchange rate");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl CurrencyConverter for ExchangeRateApiClient {
    async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ConversionError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to).await?;
        convert_amount(amount, rate.rate, CONVERTED_DECIMAL_PLACES)
    }
}
