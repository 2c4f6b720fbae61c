//! Background jobs: price refresh, trending recompute, sitemap upkeep.
//!
//! Plain tokio interval loops. A failed tick is logged and retried on
//! the next interval; nothing here is allowed to kill the process.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use crate::{
    db::{trending::TrendingRepository, votes::VoteRepository},
    seo,
    state::AppState,
};

pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(price_loop(state.clone()));
    tokio::spawn(trending_loop(state.clone()));
    tokio::spawn(sitemap_loop(state));
}

async fn price_loop(state: Arc<AppState>) {
    let mut tick = tokio::time::interval(state.config.price_refresh_interval);

    loop {
        tick.tick().await;

        match state.prices.refresh_all(&state.db).await {
            Ok(count) => info!("Price refresh updated {count} quotes"),
            Err(e) => warn!("Price refresh failed: {e}"),
        }
    }
}

/// Order coins by votes over the trailing day window, highest first,
/// slug as the deterministic tie-break, truncated to the configured size.
pub fn rank_trending(mut counts: Vec<(String, i64)>, size: usize) -> Vec<(String, i64)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(size);

    counts
}

async fn recompute_trending(state: &AppState) -> Result<usize, sea_orm::DbErr> {
    let cutoff = Utc::now().date_naive() - ChronoDuration::days(1);

    let counts = VoteRepository::counts_since(&state.db, cutoff).await?;
    let ranked = rank_trending(counts, state.config.trending_size as usize);
    let len = ranked.len();

    TrendingRepository::rewrite(&state.db, &ranked).await?;

    Ok(len)
}

async fn trending_loop(state: Arc<AppState>) {
    let mut tick = tokio::time::interval(state.config.trending_interval);

    loop {
        tick.tick().await;

        match recompute_trending(&state).await {
            Ok(count) => info!("Trending recomputed with {count} coins"),
            Err(e) => warn!("Trending recompute failed: {e}"),
        }
    }
}

/// Rebuild the sitemap each interval and ping IndexNow when the url set
/// changed since the previous tick.
async fn sitemap_loop(state: Arc<AppState>) {
    let client = reqwest::Client::new();
    let host = state
        .config
        .site_base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string();

    let mut tick = tokio::time::interval(state.config.sitemap_interval);
    let mut last_urls: Vec<String> = Vec::new();

    loop {
        tick.tick().await;

        let slugs = match crate::db::coins::CoinRepository::approved_slugs(&state.db).await {
            Ok(slugs) => slugs,
            Err(e) => {
                warn!("Sitemap rebuild failed: {e}");
                continue;
            }
        };

        let urls = seo::site_urls(&state.config.site_base_url, &slugs);
        if urls == last_urls {
            continue;
        }

        state
            .cache
            .put_json(
                seo::SITEMAP_CACHE_KEY,
                &seo::render_sitemap(&urls),
                state.config.sitemap_interval,
            )
            .await;
        info!("Sitemap rebuilt with {} urls", urls.len());

        if let Some(key) = &state.config.indexnow_key {
            if let Err(e) = seo::submit_indexnow(&client, &host, key, &urls).await {
                warn!("IndexNow submission failed: {e:#}");
            }
        }

        last_urls = urls;
    }
}
