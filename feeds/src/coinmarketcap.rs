//! CoinMarketCap client.
//!
//! Secondary price source, only constructed when an API key is
//! configured. Queries `/v2/cryptocurrency/quotes/latest` by slug, which
//! matches the slugs we use as coin ids.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{PriceProvider, Quote};

pub const DEFAULT_BASE: &str = "https://pro-api.coinmarketcap.com";

pub struct CoinMarketCap {
    client: Client,
    base: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    data: HashMap<String, Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    slug: String,
    quote: EntryQuote,
}

#[derive(Debug, Deserialize)]
struct EntryQuote {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: Option<f64>,
    market_cap: Option<f64>,
    percent_change_24h: Option<f64>,
}

impl CoinMarketCap {
    pub fn new(api_key: String) -> Self {
        Self::with_base(DEFAULT_BASE, api_key).expect("default base url is valid")
    }

    pub fn with_base(base: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent("coinvote/0.1")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("coinmarketcap: building http client")?;
        let base = Url::parse(base).context("coinmarketcap: parsing base url")?;

        Ok(Self {
            client,
            base,
            api_key,
        })
    }
}

/// Parse a `quotes/latest` body. Entries are keyed by numeric CMC id, so
/// quotes are re-keyed by the slug carried inside each entry.
pub fn parse_quotes_latest(body: &str) -> Result<HashMap<String, Quote>> {
    let parsed: QuotesResponse =
        serde_json::from_str(body).context("coinmarketcap: parsing quotes response")?;

    let now = Utc::now();
    let mut out = HashMap::new();

    for entry in parsed.data.into_values() {
        let Some(price) = entry.quote.usd.price else {
            continue;
        };

        out.insert(
            entry.slug.clone(),
            Quote {
                slug: entry.slug,
                price_usd: price,
                market_cap_usd: entry.quote.usd.market_cap,
                change_24h: entry.quote.usd.percent_change_24h,
                fetched_at: now,
            },
        );
    }

    Ok(out)
}

#[async_trait]
impl PriceProvider for CoinMarketCap {
    fn name(&self) -> &'static str {
        "coinmarketcap"
    }

    async fn quotes_usd(&self, slugs: &[String]) -> Result<HashMap<String, Quote>> {
        if slugs.is_empty() {
            return Ok(HashMap::new());
        }

        let mut url = self.base.clone();
        url.set_path("/v2/cryptocurrency/quotes/latest");
        url.query_pairs_mut()
            .append_pair("slug", &slugs.join(","))
            .append_pair("convert", "USD");

        let body = self
            .client
            .get(url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await
            .context("coinmarketcap: request failed")?
            .error_for_status()
            .context("coinmarketcap: non-success status")?
            .text()
            .await
            .context("coinmarketcap: reading body")?;

        parse_quotes_latest(&body)
    }
}
