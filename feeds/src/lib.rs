//! Third-party price feeds.
//!
//! Every provider answers the same question: given a set of coin slugs,
//! what are their USD quotes right now. The server tries providers in a
//! fixed order and falls back to its database mirror when all of them
//! fail, so a provider here is allowed to error freely.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod coingecko;
pub mod coinmarketcap;

pub use coingecko::CoinGecko;
pub use coinmarketcap::CoinMarketCap;

/// A USD spot quote for one coin, keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub slug: String,
    pub price_usd: f64,
    pub market_cap_usd: Option<f64>,
    pub change_24h: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Fetch USD quotes for the given slugs. Slugs the provider does not
    /// know are simply absent from the result map.
    async fn quotes_usd(&self, slugs: &[String]) -> anyhow::Result<HashMap<String, Quote>>;
}
