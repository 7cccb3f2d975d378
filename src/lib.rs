// Library exports for the server binary and integration tests

pub mod db;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod utils;

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use models::{errors::AppError, user::User};
use services::{
    auth::AuthService,
    cache_manager::CacheManager,
    email::{EmailService, Mailer},
    media_storage::MediaStorage,
    rate_limiter::{RateLimitConfig, RateLimiter},
};
use utils::config::AppConfig;

const USER_CACHE_SIZE: usize = 10_000;
const MEDIA_CACHE_SIZE: usize = 256;
const MEDIA_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub storage: Arc<MediaStorage>,
    pub auth: Arc<AuthService>,
    pub email: Arc<EmailService>,
    pub user_cache: Arc<CacheManager<String, User>>,
    pub media_cache: Arc<CacheManager<String, Vec<u8>>>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, db: SqlitePool, mailer: Arc<dyn Mailer>) -> Result<Self, AppError> {
        let storage = MediaStorage::new(&config.media_dir, &config.public_url)?;
        let auth = Arc::new(AuthService::new(&config));
        let email = EmailService::new(mailer, auth.clone());

        let user_cache = CacheManager::with_ttl_and_max_size(
            Duration::from_secs(config.user_cache_ttl_seconds),
            USER_CACHE_SIZE,
        );
        let media_cache = CacheManager::with_ttl_and_max_size(MEDIA_CACHE_TTL, MEDIA_CACHE_SIZE);
        let rate_limiter = RateLimiter::with_config(RateLimitConfig {
            max_requests: config.rate_limit_requests,
            window_duration: Duration::from_secs(config.rate_limit_window_seconds),
            trust_proxy_headers: config.trust_proxy_headers,
        });

        Ok(Self {
            config: Arc::new(config),
            db,
            storage: Arc::new(storage),
            auth,
            email: Arc::new(email),
            user_cache: Arc::new(user_cache),
            media_cache: Arc::new(media_cache),
            rate_limiter: Arc::new(rate_limiter),
        })
    }

    /// Drops the cached copy of a user after its row changed
    pub async fn forget_user(&self, email: &str) {
        self.user_cache.remove(&email.to_string()).await;
    }

    /// Drops every cached rendition of a stored image
    pub async fn forget_media(&self, public_id: &str) {
        let suffix = format!("v1/{}", public_id);
        let removed = self
            .media_cache
            .remove_where(|key| key == &suffix || key.ends_with(&format!("/{}", suffix)))
            .await;
        if removed > 0 {
            tracing::debug!("Dropped {} cached renditions of {}", removed, public_id);
        }
    }

    /// Base URL with a trailing slash, used in e-mail links
    pub fn base_url(&self) -> String {
        format!("{}/", self.config.public_url.trim_end_matches('/'))
    }
}
