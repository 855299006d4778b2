use dotenvy::dotenv;
use meeple_exchange::{
    api::{self, AppState},
    auth::JwtAuthenticator,
    config::{database, settings},
    core::{clock::SystemClock, profile::ProfileCache},
    errors::{Error, Result},
    gateway::StripeGateway,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How long looked-up profiles stay cached.
const PROFILE_CACHE_TTL_MINUTES: i64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings and secrets
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let jwt_secret = settings::require_secret("AUTH_JWT_SECRET")?;
    let stripe_key = settings::require_secret("STRIPE_SECRET_KEY")?;

    // 4. Database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Serve
    let state = AppState {
        db: Arc::new(db),
        gateway: Arc::new(StripeGateway::new(&settings.payments.api_base, stripe_key)),
        auth: Arc::new(JwtAuthenticator::new(
            &jwt_secret,
            &settings.auth.jwt_audience,
        )),
        profiles: Arc::new(ProfileCache::new(
            chrono::Duration::minutes(PROFILE_CACHE_TTL_MINUTES),
            Arc::new(SystemClock),
        )),
        settings: Arc::new(settings),
    };

    let bind_address = state.settings.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!(%bind_address, "Listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::Io)?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
