//! Assignment Helper API Gateway
//!
//! The single HTTP entry point. Handles:
//! - Student registration and login
//! - Assignment uploads and the extraction workflow hand-off
//! - The analyze callback that runs plagiarism scoring
//! - Corpus administration
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;
mod workflow;

use acadhelper_analysis::{AnalysisService, CorpusService, PgVectorMatcher, SimilarityMatcher};
use acadhelper_common::{
    auth::JwtManager,
    config::{AppConfig, ObservabilityConfig},
    db::{bootstrap_schema, DbPool},
    embeddings::create_embedder,
    errors::Result,
    metrics::{register_metrics, EMBEDDING_BUCKETS},
    Embedder, Repository,
};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::signal;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};
use crate::workflow::WorkflowNotifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub analysis: Arc<AnalysisService>,
    pub corpus: Arc<CorpusService>,
    pub jwt: Arc<JwtManager>,
    pub workflow: Arc<WorkflowNotifier>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire services over one pool and one embedder
    pub fn new(
        config: AppConfig,
        db: DbPool,
        embedder: Arc<dyn Embedder>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let repo = Repository::new(db.clone());
        let matcher: Arc<dyn SimilarityMatcher> = Arc::new(PgVectorMatcher::new(db));

        let analysis = AnalysisService::new(
            repo.clone(),
            embedder.clone(),
            matcher,
            &config.analysis,
        )?;
        let corpus = CorpusService::new(repo.clone(), embedder);
        let jwt = JwtManager::new(&config.auth.jwt_secret, config.auth.jwt_expiration_secs);
        let workflow = WorkflowNotifier::new(&config.workflow)?;

        Ok(Self {
            config: Arc::new(config),
            repo,
            analysis: Arc::new(analysis),
            corpus: Arc::new(corpus),
            jwt: Arc::new(jwt),
            workflow: Arc::new(workflow),
            metrics,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.observability);

    info!("Starting Assignment Helper gateway v{}", acadhelper_common::VERSION);

    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let metrics = if config.observability.metrics_enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };

    let embedder = create_embedder(&config.embedding)?;
    info!(
        provider = %config.embedding.provider,
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder ready"
    );

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.bootstrap_schema {
        bootstrap_schema(db.write(), config.embedding.dimension).await?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db, embedder, metrics)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            EMBEDDING_BUCKETS,
        )?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    register_metrics();
    Ok(handle)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timed: Router<AppState> = Router::new()
        // Probes and banner
        .route("/", get(handlers::health::home))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Accounts
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))

        // Assignments
        .route("/assignments/upload", post(handlers::assignments::upload_assignment))
        .route("/assignments/{id}", get(handlers::assignments::get_assignment))

        // Corpus administration
        .route("/sources", put(handlers::sources::upsert_source))
        .route_layer(TimeoutLayer::new(config.request_timeout()));

    // Extraction workflow callback; scoring a long document is not capped
    let callback: Router<AppState> = Router::new()
        .route("/analyze/callback", post(handlers::analyze::callback));

    let mut router = timed.merge(callback).with_state(state);

    if config.rate_limit.enabled {
        router = router.layer(axum::middleware::from_fn_with_state(
            create_rate_limiter(&config.rate_limit),
            rate_limit_middleware,
        ));
    }

    router
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
                .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
                .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes)),
        )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
