use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::models::{errors::AppError, messages};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per identifier inside one window
    pub max_requests: usize,
    pub window_duration: Duration,
    /// Key on `X-Forwarded-For` / `X-Real-IP`; only safe behind a proxy that sets them
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            trust_proxy_headers: false,
        }
    }
}

/// Sliding window of request instants for one client
#[derive(Debug, Default)]
struct Window {
    hits: VecDeque<Instant>,
}

impl Window {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.duration_since(*oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

/// In-process sliding-window limiter keyed by client identifier
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Records one request, or rejects it when the window is full
    pub async fn check_rate_limit(&self, identifier: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let window = windows.entry(identifier.to_string()).or_default();

        window.prune(now, self.config.window_duration);

        if window.hits.len() >= self.config.max_requests {
            tracing::warn!("Rate limit hit for {}", identifier);
            return Err(AppError::rate_limited(messages::TOO_MANY_REQUESTS));
        }

        window.hits.push_back(now);
        Ok(())
    }

    pub async fn get_remaining_requests(&self, identifier: &str) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let used = match windows.get_mut(identifier) {
            Some(window) => {
                window.prune(now, self.config.window_duration);
                window.hits.len()
            }
            None => 0,
        };

        self.config.max_requests.saturating_sub(used)
    }

    pub async fn reset(&self, identifier: &str) {
        self.windows.write().await.remove(identifier);
    }

    /// Drops identifiers whose windows emptied out
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();

        windows.retain(|_, window| {
            window.prune(now, self.config.window_duration);
            !window.hits.is_empty()
        });

        let removed = before - windows.len();
        if removed > 0 {
            tracing::debug!("Cleaned up {} idle rate limit windows", removed);
        }
        removed
    }

    pub async fn get_stats(&self) -> RateLimiterStats {
        let windows = self.windows.read().await;

        RateLimiterStats {
            tracked_clients: windows.len(),
            total_requests: windows.values().map(|w| w.hits.len()).sum(),
            max_requests: self.config.max_requests,
            window_duration_seconds: self.config.window_duration.as_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RateLimiterStats {
    pub tracked_clients: usize,
    pub total_requests: usize,
    pub max_requests: usize,
    pub window_duration_seconds: u64,
}

/// The peer address, or with `trust_proxy_headers` the first `X-Forwarded-For`
/// hop or `X-Real-IP`. Requests without connection info share one bucket.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(client) = forwarded_client(headers) {
            return client.to_string();
        }
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => "anonymous".to_string(),
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded.or(real_ip)
}

/// Middleware guarding a router with the shared limiter
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let identifier = client_identifier(
        request.headers(),
        peer,
        limiter.config.trust_proxy_headers,
    );

    match limiter.check_rate_limit(&identifier).await {
        Ok(()) => next.run(request).await,
        Err(error) => error.into_response(),
    }
}
