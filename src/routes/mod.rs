use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub mod dashboard;
pub mod health;
pub mod payments;
pub mod properties;
pub mod tenants;
pub mod units;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(dashboard::router())
        .merge(properties::router())
        .merge(units::router())
        .merge(tenants::router())
        .merge(payments::router())
}

pub(crate) fn db_pool(state: &AppState) -> AppResult<&sqlx::PgPool> {
    state.db_pool.as_ref().ok_or_else(|| {
        AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
    })
}
