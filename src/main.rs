use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_lead_scoring_api::batch::BatchProcessor;
use rust_lead_scoring_api::config::Config;
use rust_lead_scoring_api::context::CompanyContext;
use rust_lead_scoring_api::handlers::{self, AppState};
use rust_lead_scoring_api::llm_client::GeminiClient;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The company context document (missing or empty is fatal).
/// - The language model client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server and runs until Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let company = CompanyContext::load(&config)?;

    let model = GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        config.model_timeout(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize model client: {}", e))?;
    tracing::info!("✓ Model client initialized: {}", model.endpoint());

    let processor = BatchProcessor::new(Arc::new(model), config.max_concurrency);

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        company: Arc::new(company),
        processor,
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

    // Health and docs bypass rate limiting
    let protected_routes = handlers::protected_routes().layer(ServiceBuilder::new().layer(
        GovernorLayer {
            config: governor_conf,
        },
    ));

    let app = handlers::assemble(app_state, protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
