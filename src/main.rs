// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::ingestor::{IngestSettings, Ingestor};
use crate::application::key_service::KeyService;
use crate::application::sampler::Sampler;
use crate::application::session::SessionRegistry;
use crate::application::snapshot_cache::SnapshotCache;
use crate::application::snapshot_store::SnapshotStore;
use crate::application::source_resolver::SourceResolver;
use crate::application::view_spec::{ViewConfig, build_views};
use crate::domain::weather::Coordinates;
use crate::infrastructure::config::{AppConfig, DomainKind, load_config};
use crate::infrastructure::csv_codec::CsvCodec;
use crate::infrastructure::file_store::CsvFileStore;
use crate::infrastructure::memory_store::MemorySnapshotStore;
use crate::infrastructure::open_weather::OpenWeatherSampler;
use crate::infrastructure::yahoo_finance::YahooQuoteSampler;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let timeout = Duration::from_secs(config.ingest.request_timeout_secs);

    match config.domain {
        DomainKind::Weather => {
            let resolver = SourceResolver::new(
                config
                    .weather
                    .beaches
                    .iter()
                    .map(|beach| {
                        let coordinates = Coordinates {
                            latitude: beach.latitude,
                            longitude: beach.longitude,
                        };
                        (beach.name.clone(), coordinates)
                    })
                    .collect(),
            )?;
            let api_key = config
                .weather
                .api_key
                .clone()
                .context("OPEN_WEATHER_API_KEY is not set")?;
            let sampler = OpenWeatherSampler::new(config.weather.url_template.clone(), api_key, timeout)?;
            serve(
                &config,
                sampler,
                resolver,
                config.weather.default_selection.as_deref(),
                &config.weather.views,
            )
            .await
        }
        DomainKind::Stock => {
            let resolver = SourceResolver::new(
                config
                    .stock
                    .companies
                    .iter()
                    .map(|company| (company.name.clone(), company.ticker.clone()))
                    .collect(),
            )?;
            let sampler = YahooQuoteSampler::new(config.stock.url_template.clone(), timeout)?;
            serve(
                &config,
                sampler,
                resolver,
                config.stock.default_selection.as_deref(),
                &config.stock.views,
            )
            .await
        }
    }
}

async fn serve<S>(
    config: &AppConfig,
    sampler: S,
    resolver: SourceResolver<S::Params>,
    default_selection: Option<&str>,
    views: &[ViewConfig],
) -> anyhow::Result<()>
where
    S: Sampler + 'static,
    S::Params: 'static,
{
    // Create snapshot store (infrastructure layer)
    let store: Arc<dyn SnapshotStore> = match &config.ingest.snapshot_path {
        Some(path) => {
            let store = CsvFileStore::open(path)
                .await
                .with_context(|| format!("Failed to open snapshot file {path}"))?;
            tracing::info!(path = %store.path().display(), "publishing snapshot to file");
            Arc::new(store)
        }
        None => {
            tracing::info!("keeping snapshot in memory");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    let resolver = Arc::new(resolver);
    let keys = KeyService::from_resolver(resolver.clone());
    let default_selection = keys.default_selection(default_selection)?;
    let views = build_views::<S::Record>(views)?;
    tracing::info!(keys = resolver.len(), views = views.len(), "views configured");

    // Start the ingest loop; the server keeps serving the last window after it finishes
    let settings = IngestSettings {
        interval: Duration::from_secs(config.ingest.interval_secs),
        max_rounds: config.ingest.max_rounds,
        capacity: config.ingest.readings_per_key * resolver.len(),
    };
    let mut ingestor = Ingestor::new(
        Arc::new(sampler),
        resolver,
        store.clone(),
        Arc::new(CsvCodec),
        settings,
    );
    tokio::spawn(async move {
        if let Ok(reports) = ingestor.run().await {
            let partial = reports.iter().filter(|r| r.is_partial()).count();
            tracing::info!(rounds = reports.len(), partial, "ingest finished");
        }
    });

    // Create services (application layer)
    let cache = Arc::new(SnapshotCache::new(store, Arc::new(CsvCodec)));
    let sessions = SessionRegistry::<S::Record>::new(cache, views, keys, default_selection)?;
    let state = Arc::new(AppState { sessions });

    // Build router (presentation layer)
    let app = router(state);

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server.addr))?;
    tracing::info!(%addr, "starting shoreline-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
