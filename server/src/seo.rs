//! SEO artifacts: sitemap.xml, robots.txt, IndexNow pings.
//!
//! The sitemap is rebuilt from the approved coin set, cached in Redis,
//! and pushed to search engines through the IndexNow endpoint whenever
//! the url set changes.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::info;

use crate::{db::coins::CoinRepository, error::AppError, state::AppState};

pub const SITEMAP_CACHE_KEY: &str = "seo:sitemap";
pub const INDEXNOW_ENDPOINT: &str = "https://api.indexnow.org/indexnow";

/// Urls the sitemap covers: the landing pages plus one page per
/// approved coin.
pub fn site_urls(base: &str, slugs: &[String]) -> Vec<String> {
    let base = base.trim_end_matches('/');

    let mut urls = vec![
        format!("{base}/"),
        format!("{base}/trending"),
        format!("{base}/promoted"),
    ];
    urls.extend(slugs.iter().map(|slug| format!("{base}/coins/{slug}")));

    urls
}

pub fn render_sitemap(urls: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for url in urls {
        xml.push_str("  <url><loc>");
        xml.push_str(url);
        xml.push_str("</loc></url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots(base: &str) -> String {
    let base = base.trim_end_matches('/');

    format!(
        "User-agent: *\n\
         Allow: /\n\
         Disallow: /api/admin/\n\
         \n\
         Sitemap: {base}/sitemap.xml\n"
    )
}

pub fn indexnow_payload(host: &str, key: &str, urls: &[String]) -> serde_json::Value {
    json!({
        "host": host,
        "key": key,
        "urlList": urls,
    })
}

pub async fn submit_indexnow(
    client: &reqwest::Client,
    host: &str,
    key: &str,
    urls: &[String],
) -> Result<()> {
    let response = client
        .post(INDEXNOW_ENDPOINT)
        .json(&indexnow_payload(host, key, urls))
        .send()
        .await
        .context("indexnow: request failed")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("indexnow: rejected with status {status}");
    }

    info!("Submitted {} urls to IndexNow", urls.len());
    Ok(())
}

/// Build the sitemap from the database, preferring the cached render.
pub async fn build_sitemap(state: &AppState) -> Result<String, AppError> {
    if let Some(cached) = state.cache.get_json::<String>(SITEMAP_CACHE_KEY).await {
        return Ok(cached);
    }

    let slugs = CoinRepository::approved_slugs(&state.db).await?;
    let xml = render_sitemap(&site_urls(&state.config.site_base_url, &slugs));

    state
        .cache
        .put_json(SITEMAP_CACHE_KEY, &xml, state.config.sitemap_interval)
        .await;

    Ok(xml)
}

pub async fn sitemap_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let xml = build_sitemap(&state).await?;

    Ok(([(CONTENT_TYPE, "application/xml")], xml).into_response())
}

pub async fn robots_handler(State(state): State<Arc<AppState>>) -> Response {
    (
        [(CONTENT_TYPE, "text/plain")],
        render_robots(&state.config.site_base_url),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_lists_static_and_coin_pages() {
        let urls = site_urls(
            "https://coinvote.example/",
            &["bitcoin".to_string(), "pepe".to_string()],
        );
        let xml = render_sitemap(&urls);

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://coinvote.example/</loc>"));
        assert!(xml.contains("<loc>https://coinvote.example/coins/bitcoin</loc>"));
        assert!(xml.contains("<loc>https://coinvote.example/coins/pepe</loc>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn robots_points_at_sitemap_and_hides_admin() {
        let robots = render_robots("https://coinvote.example");

        assert!(robots.contains("Disallow: /api/admin/"));
        assert!(robots.contains("Sitemap: https://coinvote.example/sitemap.xml"));
    }

    #[test]
    fn indexnow_payload_shape() {
        let payload = indexnow_payload(
            "coinvote.example",
            "abc123",
            &["https://coinvote.example/coins/pepe".to_string()],
        );

        assert_eq!(payload["host"], "coinvote.example");
        assert_eq!(payload["key"], "abc123");
        assert_eq!(payload["urlList"].as_array().unwrap().len(), 1);
    }
}
