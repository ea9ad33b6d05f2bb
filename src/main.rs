//! Showcase - catalog and film library admin backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showcase::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxRepository, SqlxSessionRepository, SqlxUserRepository},
    },
    services::{CatalogService, FilmService, LocalFileStore, UserService},
};

/// Interval of the expired session sweep
const SESSION_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showcase=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting showcase...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Create repositories and services
    let files = LocalFileStore::boxed(&config.upload.path);

    let user_service = Arc::new(UserService::with_settings(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        config.auth.session_minutes,
        config.auth.public_url.clone(),
    ));
    let catalog_service = Arc::new(CatalogService::new(
        SqlxRepository::boxed(pool.clone()),
        SqlxRepository::boxed(pool.clone()),
        SqlxRepository::boxed(pool.clone()),
        files.clone(),
        config.listing.clone(),
    ));
    let film_service = Arc::new(FilmService::new(
        SqlxRepository::boxed(pool.clone()),
        SqlxRepository::boxed(pool.clone()),
        SqlxRepository::boxed(pool.clone()),
        files,
        config.listing.clone(),
    ));

    let state = AppState {
        user_service: user_service.clone(),
        catalog_service,
        film_service,
        upload_config: Arc::new(config.upload.clone()),
        auth_config: Arc::new(config.auth.clone()),
    };

    // Sweep expired sessions every five minutes
    {
        let users = user_service.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SESSION_CLEANUP_SECS));
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!("Removed {} expired sessions", count),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
