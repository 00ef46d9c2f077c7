use anyhow::Context;
use skyseat_api::{
    app,
    state::{AppState, AuthConfig, RateLimit},
};
use skyseat_core::{FlightCatalog, IdentityService, OrderRepository};
use skyseat_order::{AdminBooking, BookingCoordinator, InMemoryOrderRepository, OrderManager};
use skyseat_store::{
    app_config::{Config, StorageBackend},
    CircuitBreaker, DbClient, HttpFlightCatalog, HttpIdentityService, PostgresOrderRepository,
    RedisClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "skyseat_api=debug,skyseat_order=debug,skyseat_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting SkySeat booking API on port {}", config.server.port);

    let orders: Arc<dyn OrderRepository> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PostgresOrderRepository::new(db.pool.clone()))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory order storage; orders are lost on restart");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Invalid Redis url")?,
        )),
        None => None,
    };

    let breaker = CircuitBreaker::new(
        "flight-catalog",
        config.catalog.breaker_threshold,
        Duration::from_secs(config.catalog.breaker_reset_seconds),
    );
    let catalog: Arc<dyn FlightCatalog> = Arc::new(
        HttpFlightCatalog::new(&config.catalog.base_url, config.catalog.timeout(), breaker, redis.clone())
            .context("Failed to build flight catalog client")?,
    );
    let identity: Arc<dyn IdentityService> = Arc::new(
        HttpIdentityService::new(
            &config.identity.base_url,
            config.identity.timeout(),
            config.identity.service_token.clone(),
        )
        .context("Failed to build identity client")?,
    );

    let catalog_timeout = config.catalog.timeout();
    let coordinator = Arc::new(BookingCoordinator::new(catalog.clone(), orders.clone(), catalog_timeout));
    let manager = Arc::new(OrderManager::new(catalog, orders, catalog_timeout));
    let admin_booking = Arc::new(AdminBooking::new(identity, coordinator.clone()));

    let app_state = AppState {
        coordinator,
        orders: manager,
        admin_booking,
        redis,
        auth: AuthConfig { secret: config.auth.jwt_secret.clone() },
        rate_limit: RateLimit { requests_per_minute: config.rate_limit.requests_per_minute },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;

    Ok(())
}
