use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub site_base_url: String,
    pub cmc_api_key: Option<String>,
    pub indexnow_key: Option<String>,
    pub price_ttl: Duration,
    pub price_refresh_interval: Duration,
    pub trending_interval: Duration,
    pub trending_size: u64,
    pub sitemap_interval: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "1111"),
            database_url: try_load("DATABASE_URL", "sqlite://coinvote.db?mode=rwc"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            site_base_url: try_load("SITE_BASE_URL", "https://coinvote.example"),
            cmc_api_key: try_read_secret("CMC_API_KEY"),
            indexnow_key: try_read_secret("INDEXNOW_KEY"),
            price_ttl: Duration::from_secs(try_load("PRICE_TTL_SECS", "60")),
            price_refresh_interval: Duration::from_secs(try_load("PRICE_REFRESH_SECS", "120")),
            trending_interval: Duration::from_secs(try_load("TRENDING_REFRESH_SECS", "300")),
            trending_size: try_load("TRENDING_SIZE", "10"),
            sitemap_interval: Duration::from_secs(try_load("SITEMAP_REFRESH_SECS", "3600")),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Docker secrets file, falling back to a plain env var. Both price-feed
/// keys are optional: the service runs without them on reduced fallbacks.
fn try_read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(s) = read_to_string(&path) {
        return Some(s.trim().to_string());
    }

    match env::var(secret_name) {
        Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => {
            warn!("Secret {secret_name} not configured");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::try_load;

    #[test]
    fn defaults_apply_when_unset() {
        let port: u16 = try_load("CONFIG_TEST_UNSET_PORT", "1111");
        assert_eq!(port, 1111);
    }

    #[test]
    fn env_overrides_default() {
        std::env::set_var("CONFIG_TEST_SET_PORT", "8080");
        let port: u16 = try_load("CONFIG_TEST_SET_PORT", "1111");
        assert_eq!(port, 8080);
        std::env::remove_var("CONFIG_TEST_SET_PORT");
    }
}
