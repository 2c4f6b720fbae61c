//! CoinGecko client.
//!
//! Primary price source. Coin slugs double as CoinGecko asset ids, so
//! `/simple/price` can be queried with the slugs directly. The markets
//! endpoint backs the bulk import CLI.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{PriceProvider, Quote};

pub const DEFAULT_BASE: &str = "https://api.coingecko.com/api/v3";

#[derive(Clone)]
pub struct CoinGecko {
    client: Client,
    base: Url,
}

/// One row of `/coins/markets`, the shape the bulk importer consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

impl CoinGecko {
    pub fn new() -> Self {
        Self::with_base(DEFAULT_BASE).expect("default base url is valid")
    }

    pub fn with_base(base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("coinvote/0.1")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("coingecko: building http client")?;
        let base = Url::parse(base).context("coingecko: parsing base url")?;

        Ok(Self { client, base })
    }

    /// Fetch one page of the markets listing, ordered by market cap.
    pub async fn markets(&self, page: u32, per_page: u32) -> Result<Vec<MarketRow>> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("coingecko: base url cannot have segments"))?
            .extend(["coins", "markets"]);
        url.query_pairs_mut()
            .append_pair("vs_currency", "usd")
            .append_pair("order", "market_cap_desc")
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());

        debug!("Fetching coingecko markets page {page}");

        let body = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .context("coingecko: markets request failed")?
            .error_for_status()
            .context("coingecko: markets non-success status")?
            .text()
            .await
            .context("coingecko: reading markets body")?;

        serde_json::from_str(&body).context("coingecko: parsing markets response")
    }
}

impl Default for CoinGecko {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `/simple/price` body like
/// `{"bitcoin":{"usd":1.0,"usd_market_cap":2.0,"usd_24h_change":-0.5}}`.
pub fn parse_simple_price(body: &str) -> Result<HashMap<String, Quote>> {
    let parsed: HashMap<String, HashMap<String, f64>> =
        serde_json::from_str(body).context("coingecko: parsing simple/price response")?;

    let now = Utc::now();
    let mut out = HashMap::new();

    for (slug, fields) in parsed {
        // Entries without a usd price are useless downstream, skip them.
        let Some(price) = fields.get("usd") else {
            continue;
        };

        out.insert(
            slug.clone(),
            Quote {
                slug,
                price_usd: *price,
                market_cap_usd: fields.get("usd_market_cap").copied(),
                change_24h: fields.get("usd_24h_change").copied(),
                fetched_at: now,
            },
        );
    }

    Ok(out)
}

#[async_trait]
impl PriceProvider for CoinGecko {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn quotes_usd(&self, slugs: &[String]) -> Result<HashMap<String, Quote>> {
        if slugs.is_empty() {
            return Ok(HashMap::new());
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("coingecko: base url cannot have segments"))?
            .extend(["simple", "price"]);
        url.query_pairs_mut()
            .append_pair("ids", &slugs.join(","))
            .append_pair("vs_currencies", "usd")
            .append_pair("include_market_cap", "true")
            .append_pair("include_24hr_change", "true");

        let body = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .context("coingecko: request failed")?
            .error_for_status()
            .context("coingecko: non-success status")?
            .text()
            .await
            .context("coingecko: reading body")?;

        parse_simple_price(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_simple_price;

    #[test]
    fn parses_full_quote() {
        let body = r#"{
            "bitcoin": {"usd": 64000.5, "usd_market_cap": 1.26e12, "usd_24h_change": -1.4},
            "pepe": {"usd": 0.0000071, "usd_market_cap": 3.0e9, "usd_24h_change": 12.9}
        }"#;

        let quotes = parse_simple_price(body).unwrap();
        assert_eq!(quotes.len(), 2);

        let btc = &quotes["bitcoin"];
        assert_eq!(btc.slug, "bitcoin");
        assert_eq!(btc.price_usd, 64000.5);
        assert_eq!(btc.change_24h, Some(-1.4));
    }

    #[test]
    fn skips_entries_without_usd_price() {
        let body = r#"{"ghostcoin": {"usd_market_cap": 1.0}, "bitcoin": {"usd": 1.0}}"#;

        let quotes = parse_simple_price(body).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(quotes.contains_key("bitcoin"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let body = r#"{"bitcoin": {"usd": 2.0}}"#;

        let quotes = parse_simple_price(body).unwrap();
        let btc = &quotes["bitcoin"];
        assert_eq!(btc.market_cap_usd, None);
        assert_eq!(btc.change_24h, None);
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(parse_simple_price("not json").is_err());
        assert!(parse_simple_price(r#"{"bitcoin": "usd"}"#).is_err());
    }
}
