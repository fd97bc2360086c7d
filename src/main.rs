//! pred-premium server binary.
//!
//! Loads configuration from the environment, connects to PostgreSQL, applies
//! migrations and serves the subscription API.

use std::sync::Arc;

use http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pred_premium::adapters::http::{subscription_router, SubscriptionAppState};
use pred_premium::adapters::{
    PostgresEntitlementRepository, PostgresSubscriptionRepository, PostgresVerifierDirectory,
    SystemClock,
};
use pred_premium::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);

    info!(
        environment = ?config.server.environment,
        database = %config.database.redacted_url(),
        "starting pred-premium"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    let state = SubscriptionAppState::new(
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        Arc::new(PostgresVerifierDirectory::new(pool)),
        Arc::new(SystemClock::new()),
    )
    .with_settings(config.subscription.clone());

    let app = subscription_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
