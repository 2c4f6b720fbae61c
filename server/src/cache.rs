//! # Redis
//!
//! Short-TTL JSON cache in front of the database and the price feeds.
//!
//! Everything stored here is re-derivable: merged price quotes (~60s),
//! the rendered sitemap (~1h). The database stays the source of truth,
//! so the cache is allowed to be missing entirely. A failed connection
//! at startup downgrades every operation to a no-op with a warning
//! instead of taking the service down.

use std::time::Duration;

use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Cache {
    manager: Option<ConnectionManager>,
}

impl Cache {
    pub async fn connect(redis_url: &str) -> Self {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let manager = match Client::open(redis_url) {
            Ok(client) => match client.get_connection_manager_with_config(config).await {
                Ok(manager) => Some(manager),
                Err(e) => {
                    warn!("Redis unavailable, running without cache: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("Invalid redis url, running without cache: {e}");
                None
            }
        };

        Self { manager }
    }

    pub fn disabled() -> Self {
        Self { manager: None }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut con = self.manager.clone()?;

        match con.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Discarding undecodable cache entry {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!("Cache read failed for {key}: {e}");
                None
            }
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(mut con) = self.manager.clone() else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize cache entry {key}: {e}");
                return;
            }
        };

        if let Err(e) = con
            .set_ex::<_, _, ()>(key, raw, ttl.as_secs().max(1))
            .await
        {
            debug!("Cache write failed for {key}: {e}");
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let Some(mut con) = self.manager.clone() else {
            return;
        };

        if let Err(e) = con.del::<_, ()>(key).await {
            debug!("Cache delete failed for {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;
    use std::time::Duration;

    #[tokio::test]
    async fn disabled_cache_is_inert() {
        let cache = Cache::disabled();

        cache.put_json("k", &42u32, Duration::from_secs(5)).await;
        assert_eq!(cache.get_json::<u32>("k").await, None);

        cache.invalidate("k").await;
    }
}
