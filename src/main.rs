use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_decision_api::config::Config;
use credit_decision_api::decision_engine::DecisionEngineClient;
use credit_decision_api::handlers::{self, AppState};
use credit_decision_api::orchestrator::DecisionOrchestrator;
use credit_decision_api::profile_store::{PgProfileStore, ProfileLookup};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the profile store connection and the
/// decision engine client, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_decision_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let defaults = Arc::new(config.load_profile_defaults()?);
    tracing::info!("Profile defaults ready");

    let profile_store = PgProfileStore::connect(&config.database_url).await?;
    tracing::info!("Profile database connection pool established");

    let engine = DecisionEngineClient::new(
        config.decision_engine_url.clone(),
        config.decision_engine_timeout,
    )?;
    tracing::info!(
        "✓ Decision engine client initialized: {}",
        config.decision_engine_url
    );

    let orchestrator = DecisionOrchestrator::new(
        ProfileLookup::new(Arc::new(profile_store)),
        engine,
        defaults,
    );

    let app_state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    });

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let app = handlers::routes(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

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
