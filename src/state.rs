use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db::build_pool;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub dashboard_cache: Cache<String, Value>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = build_pool(&config)?;

        let dashboard_cache = Cache::builder()
            .max_capacity(config.dashboard_cache_max_entries)
            .time_to_live(Duration::from_secs(config.dashboard_cache_ttl_seconds))
            .build();

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            dashboard_cache,
        })
    }
}
