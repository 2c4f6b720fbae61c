use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{cache::Cache, config::Config, db, prices::PriceService};

pub struct AppState {
    pub config: Config,
    pub db: DatabaseConnection,
    pub cache: Cache,
    pub prices: PriceService,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = db::connect(&config.database_url)
            .await
            .expect("Database misconfigured!");
        let cache = Cache::connect(&config.redis_url).await;
        let prices = PriceService::new(cache.clone(), config.price_ttl, config.cmc_api_key.clone());

        Arc::new(Self {
            config,
            db,
            cache,
            prices,
        })
    }
}
