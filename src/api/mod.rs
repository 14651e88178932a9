pub mod handlers;

pub use handlers::{get_prices, health_check, post_prices, PricesState, UPLOAD_FIELD};

use crate::db::PriceStore;
use axum::{extract::DefaultBodyLimit, routing::get, Router};

pub const PRICES_PATH: &str = "/api/v0/prices";

/// 构建路由
pub fn router<S: PriceStore>(state: PricesState<S>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            PRICES_PATH,
            get(get_prices::<S>).post(post_prices::<S>),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
