use chrono::{DateTime, Utc};
use feeds::Quote;
use serde::Serialize;

use crate::db::coins::{CoinLinks, Model as Coin};

pub mod admin;
pub mod coins;
pub mod listings;
pub mod votes;

/// Listing row shape shared by the browse, trending, and promoted
/// responses.
#[derive(Debug, Serialize)]
pub struct CoinSummary {
    pub slug: String,
    pub name: String,
    pub symbol: String,
    pub logo_url: Option<String>,
    pub is_presale: bool,
    pub votes: i64,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub change_24h: Option<f64>,
}

impl From<Coin> for CoinSummary {
    fn from(coin: Coin) -> Self {
        Self {
            slug: coin.slug,
            name: coin.name,
            symbol: coin.symbol,
            logo_url: coin.logo_url,
            is_presale: coin.is_presale,
            votes: coin.votes,
            price_usd: coin.price_usd,
            market_cap_usd: coin.market_cap_usd,
            change_24h: coin.change_24h,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoinDetail {
    pub slug: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub chain: Option<String>,
    pub contract_address: Option<String>,
    pub logo_url: Option<String>,
    pub links: Option<CoinLinks>,
    pub is_presale: bool,
    pub votes: i64,
    pub launched_at: Option<DateTime<Utc>>,
    /// Merged live quote; absent when no source knows a price yet.
    pub quote: Option<Quote>,
}

impl CoinDetail {
    pub fn new(coin: Coin, quote: Option<Quote>) -> Self {
        Self {
            slug: coin.slug,
            name: coin.name,
            symbol: coin.symbol,
            description: coin.description,
            chain: coin.chain,
            contract_address: coin.contract_address,
            logo_url: coin.logo_url,
            links: coin.links,
            is_presale: coin.is_presale,
            votes: coin.votes,
            launched_at: coin.launched_at,
            quote,
        }
    }
}
