//! The price lookup unit of work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::args::PriceArgs;
use super::source::PriceSource;
use crate::error::WorkError;
use crate::worker::task::{UnitOfWork, WorkContext};

/// Label stamped on every quote.
pub const QUOTE_SOURCE: &str = "FinanceAgent-v1";

/// Result payload of a completed lookup.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Unix time in seconds.
    pub timestamp: f64,
    pub source: String,
}

/// Looks up the price of one currency after a simulated latency.
pub struct PriceLookup {
    args: PriceArgs,
    source: Arc<dyn PriceSource>,
    delay: Duration,
}

impl PriceLookup {
    pub fn new(args: PriceArgs, source: Arc<dyn PriceSource>, delay: Duration) -> Self {
        Self { args, source, delay }
    }
}

#[async_trait]
impl UnitOfWork for PriceLookup {
    fn kind(&self) -> &str {
        "price_lookup"
    }

    async fn run(&self, ctx: WorkContext) -> Result<Value, WorkError> {
        ctx.sleep(self.delay).await?;

        let price = self.source.price(&self.args.currency).await?;
        tracing::debug!(
            task_id = %ctx.task_id,
            currency = %self.args.currency,
            source = self.source.name(),
            %price,
            "Price resolved"
        );

        let quote = PriceQuote {
            currency: self.args.currency.clone(),
            price,
            timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            source: QUOTE_SOURCE.to_string(),
        };
        serde_json::to_value(quote).map_err(|e| WorkError::Failed(format!("failed to encode quote: {e}")))
    }
}
