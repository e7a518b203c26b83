use std::process::ExitCode;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tollgate_server::{
    auth::{self, AppState, ProviderRegistry, Stores},
    config::ServerConfig,
    db::{IdentityRepository, RoleRepository, UserRepository},
    error::StartupError,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    config.validate()?;
    tracing::info!("Loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    tracing::info!("Discovering OIDC providers...");
    let registry = ProviderRegistry::discover(&config.providers, &config.auth).await?;
    if registry.names().is_empty() {
        tracing::warn!("no OIDC providers configured; only password login is available");
    }

    let stores = Stores {
        users: Arc::new(UserRepository::new(db_pool.clone())),
        identities: Arc::new(IdentityRepository::new(db_pool.clone())),
        roles: Arc::new(RoleRepository::new(db_pool)),
    };
    let app_state = Arc::new(AppState::new(&config.auth, registry, stores)?);

    let app = auth::router(app_state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
