use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod clients;
mod config;
mod domain;
mod enrichment;
mod metrics;
mod query;
mod service;
mod store;
mod utils;

use api::ApiState;
use clients::{HttpCatalogClient, HttpFeedbackClient};
use config::{AppConfig, StorageBackend};
use enrichment::FeedbackEnricher;
use service::OrderLifecycleService;
use store::{InMemoryOrderRepository, OrderRepository, PgOrderRepository};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, overridable with RUST_LOG
    // Example: RUST_LOG=order_lifecycle=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_lifecycle=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order lifecycle service");

    let config = AppConfig::load()?;

    // === 1. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Order storage ===
    let repository: Arc<dyn OrderRepository> = match config.storage.backend {
        StorageBackend::Postgres => Arc::new(PgOrderRepository::connect(&config.database).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory order storage, orders are lost on restart");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    // === 3. Collaborators (timeout, retry, circuit breaker each) ===
    let catalog = Arc::new(HttpCatalogClient::new(&config.catalog, metrics.clone())?);
    let feedback = Arc::new(HttpFeedbackClient::new(&config.feedback, metrics.clone())?);
    tracing::info!(
        catalog = %config.catalog.base_url,
        feedback = %config.feedback.base_url,
        "Collaborator clients ready"
    );

    // === 4. Lifecycle service ===
    let service = OrderLifecycleService::new(
        repository,
        catalog,
        FeedbackEnricher::new(feedback, config.enrichment.max_concurrency),
        metrics.clone(),
    );
    let state = web::Data::new(ApiState {
        service,
        pagination: config.pagination.clone(),
    });

    // === 5. HTTP: API and metrics side by side ===
    tracing::info!("🌐 Order API listening on http://{}:{}/orders", config.server.host, config.server.port);
    let api_server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    let metrics_server = metrics::start_metrics_server(metrics, config.server.host.clone(), config.metrics.port);

    futures_util::future::try_join(api_server, metrics_server).await?;

    tracing::info!("Order lifecycle service stopped");
    Ok(())
}
