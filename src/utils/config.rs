use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub media_dir: String,
    pub public_url: String,
    pub max_file_size: usize,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
    pub login_access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub email_token_ttl_seconds: i64,
    pub mail: Option<MailConfig>,
    pub rate_limit_requests: usize,
    pub rate_limit_window_seconds: u64,
    pub trust_proxy_headers: bool,
    pub user_cache_ttl_seconds: u64,
}

/// SMTP settings; only present when `MAIL_SERVER` is set
#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: "sqlite://photoshake.db?mode=rwc".to_string(),
            media_dir: "/tmp/photoshake/media".to_string(),
            public_url: "http://localhost:8000".to_string(),
            max_file_size: 10 * 1024 * 1024, // 10MB
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
            jwt_secret: "change-me".to_string(),
            access_token_ttl_seconds: 15 * 60,
            login_access_token_ttl_seconds: 2 * 60 * 60,
            refresh_token_ttl_seconds: 7 * 24 * 60 * 60,
            email_token_ttl_seconds: 24 * 60 * 60,
            mail: None,
            rate_limit_requests: 10,
            rate_limit_window_seconds: 60,
            trust_proxy_headers: false,
            user_cache_ttl_seconds: 15 * 60,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }

        if let Some(port) = parse_var::<u16>("PORT") {
            config.port = port;
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(media_dir) = env::var("MEDIA_DIR") {
            config.media_dir = media_dir;
        }

        if let Ok(public_url) = env::var("PUBLIC_URL") {
            config.public_url = public_url.trim_end_matches('/').to_string();
        }

        if let Some(size) = parse_var::<usize>("MAX_FILE_SIZE") {
            config.max_file_size = size;
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Some(timeout) = parse_var::<u64>("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = timeout;
        }

        match env::var("SECRET_KEY") {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("SECRET_KEY is not set, using an insecure development secret"),
        }

        if let Some(ttl) = parse_var::<i64>("ACCESS_TOKEN_TTL") {
            config.access_token_ttl_seconds = ttl;
        }

        if let Some(ttl) = parse_var::<i64>("LOGIN_ACCESS_TOKEN_TTL") {
            config.login_access_token_ttl_seconds = ttl;
        }

        if let Some(ttl) = parse_var::<i64>("REFRESH_TOKEN_TTL") {
            config.refresh_token_ttl_seconds = ttl;
        }

        if let Some(ttl) = parse_var::<i64>("EMAIL_TOKEN_TTL") {
            config.email_token_ttl_seconds = ttl;
        }

        if let Ok(server) = env::var("MAIL_SERVER") {
            config.mail = Some(MailConfig {
                server,
                port: parse_var::<u16>("MAIL_PORT").unwrap_or(465),
                username: env::var("MAIL_USERNAME").unwrap_or_default(),
                password: env::var("MAIL_PASSWORD").unwrap_or_default(),
                from: env::var("MAIL_FROM").unwrap_or_default(),
            });
        }

        if let Some(requests) = parse_var::<usize>("RATE_LIMIT_REQUESTS") {
            config.rate_limit_requests = requests;
        }

        if let Some(window) = parse_var::<u64>("RATE_LIMIT_WINDOW_SECONDS") {
            config.rate_limit_window_seconds = window;
        }

        if let Some(trust) = parse_var::<bool>("TRUST_PROXY_HEADERS") {
            config.trust_proxy_headers = trust;
        }

        if let Some(ttl) = parse_var::<u64>("USER_CACHE_TTL") {
            config.user_cache_ttl_seconds = ttl;
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    match env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}
