//! Price merge layer.
//!
//! The one rule: try the cache, then each provider in order, then the
//! database mirror. A successful provider answer is written through to
//! both the cache (short TTL) and the coin row's mirror columns, so the
//! mirror is exactly as fresh as the last provider success and the site
//! keeps serving prices through any feed outage.

use std::time::Duration;

use feeds::{CoinGecko, CoinMarketCap, PriceProvider, Quote};
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, info, warn};

use crate::{cache::Cache, db::coins::CoinRepository};

/// CoinGecko caps `/simple/price` around 250 ids per call.
const BULK_CHUNK: usize = 250;

pub struct PriceService {
    providers: Vec<Box<dyn PriceProvider>>,
    cache: Cache,
    ttl: Duration,
}

impl PriceService {
    pub fn new(cache: Cache, ttl: Duration, cmc_api_key: Option<String>) -> Self {
        let mut providers: Vec<Box<dyn PriceProvider>> = vec![Box::new(CoinGecko::new())];

        match cmc_api_key {
            Some(key) => providers.push(Box::new(CoinMarketCap::new(key))),
            None => info!("No CoinMarketCap key, price fallback is database-only"),
        }

        Self::with_providers(providers, cache, ttl)
    }

    pub fn with_providers(
        providers: Vec<Box<dyn PriceProvider>>,
        cache: Cache,
        ttl: Duration,
    ) -> Self {
        Self {
            providers,
            cache,
            ttl,
        }
    }

    fn cache_key(slug: &str) -> String {
        format!("price:{slug}")
    }

    /// Merged quote for one coin: cache, then providers, then mirror.
    /// `None` only when nobody, including our own database, knows the coin.
    pub async fn quote(
        &self,
        db: &DatabaseConnection,
        slug: &str,
    ) -> Result<Option<Quote>, DbErr> {
        let key = Self::cache_key(slug);

        if let Some(quote) = self.cache.get_json::<Quote>(&key).await {
            return Ok(Some(quote));
        }

        let slugs = [slug.to_string()];
        for provider in &self.providers {
            match provider.quotes_usd(&slugs).await {
                Ok(mut quotes) => {
                    if let Some(quote) = quotes.remove(slug) {
                        self.cache.put_json(&key, &quote, self.ttl).await;
                        CoinRepository::update_price_mirror(db, slug, &quote).await?;
                        return Ok(Some(quote));
                    }
                    debug!("{} has no quote for {slug}", provider.name());
                }
                Err(e) => warn!("{} quote for {slug} failed: {e:#}", provider.name()),
            }
        }

        // Every live source failed, serve the last mirrored values.
        let Some(coin) = CoinRepository::find_by_slug(db, slug).await? else {
            return Ok(None);
        };
        let Some(price_usd) = coin.price_usd else {
            return Ok(None);
        };

        Ok(Some(Quote {
            slug: coin.slug,
            price_usd,
            market_cap_usd: coin.market_cap_usd,
            change_24h: coin.change_24h,
            fetched_at: coin.price_updated_at.unwrap_or(coin.updated_at),
        }))
    }

    /// Bulk refresh for the price job: one provider call per chunk of
    /// approved coins, written through to mirrors and cache. Returns the
    /// number of refreshed quotes.
    pub async fn refresh_all(&self, db: &DatabaseConnection) -> Result<usize, DbErr> {
        let slugs = CoinRepository::approved_slugs(db).await?;
        let mut refreshed = 0;

        for chunk in slugs.chunks(BULK_CHUNK) {
            let mut quotes = None;

            for provider in &self.providers {
                match provider.quotes_usd(chunk).await {
                    Ok(q) => {
                        quotes = Some(q);
                        break;
                    }
                    Err(e) => warn!("{} bulk refresh failed: {e:#}", provider.name()),
                }
            }

            let Some(quotes) = quotes else {
                continue;
            };

            for (slug, quote) in quotes {
                self.cache
                    .put_json(&Self::cache_key(&slug), &quote, self.ttl)
                    .await;
                CoinRepository::update_price_mirror(db, &slug, &quote).await?;
                refreshed += 1;
            }
        }

        Ok(refreshed)
    }
}
