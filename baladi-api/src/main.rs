use std::net::SocketAddr;
use std::sync::Arc;

use baladi_api::{
    app,
    state::{AppState, AuthConfig},
};
use baladi_core::clock::{Clock, SystemClock};
use baladi_offer::eligibility::EligibilityEngine;
use baladi_offer::store::OfferStore;
use baladi_store::{Config, DbClient, PostgresOfferStore, PostgresVenueStore, RedisClient};
use baladi_venue::search::{SearchEngine, VenueStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baladi_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Baladi API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = RedisClient::new(&config.redis.url).expect("Failed to create Redis client");

    let offers: Arc<dyn OfferStore> = Arc::new(PostgresOfferStore::new(db.pool.clone()));
    let venues: Arc<dyn VenueStore> = Arc::new(PostgresVenueStore::new(db.pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let eligibility = Arc::new(EligibilityEngine::new(
        offers.clone(),
        clock.clone(),
        config.redemption.clone().into(),
    ));
    let search = Arc::new(SearchEngine::new(venues.clone(), config.search.clone().into()));

    let (events_tx, _) = tokio::sync::broadcast::channel(100);

    let app_state = AppState {
        offers,
        venues,
        eligibility,
        search,
        clock,
        redis: Arc::new(redis),
        events_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
