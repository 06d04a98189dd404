use hint_enrichment::circuit_breaker::create_enrichment_circuit_breaker;
use hint_enrichment::client::EnrichmentClient;
use hint_enrichment::config::Config;
use hint_enrichment::credentials::TokenService;
use hint_enrichment::handlers::{self, AppState};
use hint_enrichment::transport::RetryableTransport;

use axum::{routing::get, Router};
use moka::future::Cache;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the enrichment client, the record
/// deduplication cache and the HTTP routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hint_enrichment=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let credentials = TokenService::new(&config)?;
    let transport = RetryableTransport::new(config.request_timeout(), config.retry_delay())?;
    let client = EnrichmentClient::new(credentials, transport);
    tracing::info!("✓ Enrichment client initialized: {}", config.hint_service_url);

    // Record-level deduplication cache. An entry outlives any single run,
    // so a crashed run unblocks its record after the TTL.
    let processing_records_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.enrich_deadline_secs + 60))
        .max_capacity(10_000)
        .build();
    tracing::info!("Record deduplication cache initialized");

    let app_state = Arc::new(AppState {
        config: config.clone(),
        client,
        breaker: create_enrichment_circuit_breaker(),
        processing_records_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::workflow_routes(app_state).layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
