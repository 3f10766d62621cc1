use std::sync::Arc;

use parkride_server::cache::{BatchStore, CacheConfig, MemoryStore};
use parkride_server::config::AppConfig;
use parkride_server::sources::SourceBatch;
use parkride_server::web::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let store: BatchStore = Arc::new(MemoryStore::<SourceBatch>::new(
        &CacheConfig::default().with_ttl(config.cache_ttl),
    ));
    let reconciler = config.build_reconciler(store.clone());
    tracing::info!(sources = ?reconciler.source_kinds(), "source chain");

    let state = AppState::new(reconciler, config.default_location).with_store(store);

    // A failed first cycle still serves; the refresh loop retries
    let initial = state.refresh().await;
    if initial.is_empty() {
        tracing::warn!("no facilities on start-up, every source failed");
    } else {
        tracing::info!(
            facilities = initial.len(),
            source = ?initial.served_by,
            "initial facility list loaded"
        );
    }

    let refresher = state.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            refresher.refresh().await;
        }
    });

    let app = create_router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .expect("Failed to bind listener");
    tracing::info!(
        addr = %config.bind,
        refresh_secs = refresh_interval.as_secs(),
        "Park&Ride server listening on http://{}",
        config.bind
    );

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
