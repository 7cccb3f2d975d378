use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::MessageResponse;
use crate::db;
use crate::models::{errors::ErrorResponse, messages};
use crate::services::{cache_manager::CacheStats, rate_limiter::RateLimiterStats};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub user_cache: CacheStats,
    pub media_cache: CacheStats,
    pub rate_limiter: RateLimiterStats,
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new(messages::WELCOME_MESSAGE))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        user_cache: state.user_cache.get_stats().await,
        media_cache: state.media_cache.get_stats().await,
        rate_limiter: state.rate_limiter.get_stats().await,
    })
}

/// Round-trips a `SELECT 1` to the database
pub async fn healthchecker(State(state): State<AppState>) -> Response {
    match db::ping(&state.db).await {
        Ok(true) => Json(MessageResponse::new(messages::WELCOME_MESSAGE)).into_response(),
        Ok(false) => {
            tracing::error!("Database health check returned no result");
            db_failure(messages::DB_CONFIG_ERROR, "DB_CONFIG_ERROR")
        }
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            db_failure(messages::DB_CONNECT_ERROR, "DB_CONNECT_ERROR")
        }
    }
}

fn db_failure(detail: &str, error_code: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: detail.to_string(),
            error_code: error_code.to_string(),
        }),
    )
        .into_response()
}
