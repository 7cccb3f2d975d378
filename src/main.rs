use anyhow::Context;
use chrono::Utc;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoshake::{
    db,
    repository::users,
    routes::app_router,
    services::email::{LogMailer, Mailer, SmtpMailer},
    utils::config::AppConfig,
    AppState,
};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoshake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PhotoShake server");

    let config = AppConfig::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    db::migrations::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(SmtpMailer::new(mail)?),
        None => {
            tracing::warn!("MAIL_SERVER is not set, e-mails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("invalid HOST or PORT")?;

    let state = AppState::new(config, pool, mailer)?;
    spawn_maintenance(state.clone());

    let app = app_router(state);

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Hourly purge of stale blacklist entries, caches and limiter windows
fn spawn_maintenance(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;

            let cutoff = Utc::now() - chrono::Duration::seconds(state.config.refresh_token_ttl_seconds);
            match users::purge_blacklist(&state.db, cutoff).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} blacklisted tokens", purged),
                Err(e) => tracing::error!("Failed to purge token blacklist: {}", e),
            }

            state.user_cache.cleanup_expired().await;
            state.media_cache.cleanup_expired().await;
            state.rate_limiter.cleanup_expired().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
