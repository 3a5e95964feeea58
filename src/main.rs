use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use global_upvote::cache::OfflineCache;
use global_upvote::config::Config;
use global_upvote::connectivity::{probe_target, NetworkProbe, SharedConnectivity};
use global_upvote::fetcher::HttpStorySource;
use global_upvote::routes::{self, AppState};
use global_upvote::service::{start_connectivity_listener, StoryService};
use global_upvote::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "global_upvote=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("upvote.toml")?;
    info!("Reading stories from {}", config.endpoint);

    // Open the offline cache
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.cache.database_url.clone());
    let store = SqliteStore::open(config.cache.kind, &database_url).await?;
    info!("Story cache ready ({:?} storage)", config.cache.kind);

    let source = HttpStorySource::new(
        config.endpoint.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let connectivity = SharedConnectivity::default();
    let service = Arc::new(StoryService::new(
        source,
        OfflineCache::new(store),
        connectivity.clone(),
    ));

    // Watch connectivity and refetch when it comes back
    let (tx, rx) = mpsc::channel(16);
    match probe_target(&config.endpoint) {
        Some(target) => {
            let probe = NetworkProbe::new(
                target,
                Duration::from_secs(config.connectivity.probe_interval_secs),
                Duration::from_secs(config.connectivity.probe_timeout_secs),
                connectivity,
                tx,
            );
            tokio::spawn(probe.run());
        }
        None => warn!("Cannot probe {}, connectivity monitoring disabled", config.endpoint),
    }
    tokio::spawn(start_connectivity_listener(service.clone(), rx));

    // Initial load
    let initial = service.clone();
    tokio::spawn(async move {
        let outcome = initial.get_stories().await;
        info!("Initial story load: {:?}", outcome);
    });

    let app = routes::router(Arc::new(AppState { service }));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server starting on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
