//! Price sources for lookups.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::WorkError;

/// Resolves the current price of a currency code.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Name recorded in results.
    fn name(&self) -> &str;

    /// Price for an upper-cased currency code.
    async fn price(&self, currency: &str) -> Result<Decimal, WorkError>;
}

/// Static price table. Unknown currencies are priced at zero.
#[derive(Debug, Default, Clone)]
pub struct MockPriceSource;

impl MockPriceSource {
    pub fn new() -> Self {
        Self
    }

    fn lookup(currency: &str) -> Decimal {
        match currency {
            "BTC" => dec!(95432.50),
            "ETH" => dec!(2750.20),
            "USD" => dec!(34.15),
            _ => Decimal::ZERO,
        }
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn price(&self, currency: &str) -> Result<Decimal, WorkError> {
        Ok(Self::lookup(currency))
    }
}

/// Upstream response body.
#[derive(Debug, Deserialize)]
struct UpstreamQuote {
    price: Decimal,
}

/// Proxies lookups to an HTTP endpoint: `GET {base_url}?currency=XXX`
/// answering `{"price": <number>}`.
pub struct HttpPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Result<Self, WorkError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| WorkError::Upstream {
                source_name: "http".to_string(),
                reason: format!("failed to build client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn upstream_error(&self, reason: impl std::fmt::Display) -> WorkError {
        WorkError::Upstream {
            source_name: self.base_url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn price(&self, currency: &str) -> Result<Decimal, WorkError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("currency", currency)])
            .send()
            .await
            .map_err(|e| self.upstream_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.upstream_error(format!("HTTP {status}")));
        }

        let quote: UpstreamQuote = response.json().await.map_err(|e| self.upstream_error(e))?;
        tracing::debug!(currency, price = %quote.price, "Upstream price received");
        Ok(quote.price)
    }
}
