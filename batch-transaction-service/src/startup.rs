//! Application startup and lifecycle management.

use crate::config::{BatchConfig, StoreBackend};
use crate::handlers::{health, transactions};
use crate::middleware::{auth_middleware, JwtVerifier};
use crate::services::metrics::init_metrics;
use crate::services::{
    BatchTransactionEngine, InMemoryTransactionStore, PgTransactionStore, TransactionStore,
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Allowance for multipart boundaries and the form fields around the file.
/// The exact file cap is enforced by the engine.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BatchConfig>,
    pub engine: Arc<BatchTransactionEngine>,
    pub jwt: JwtVerifier,
}

impl AppState {
    pub fn new(config: BatchConfig, store: Arc<dyn TransactionStore>) -> Self {
        let engine = BatchTransactionEngine::new(store, config.upload.max_bytes);
        let jwt = JwtVerifier::new(&config.jwt.secret);

        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            jwt,
        }
    }
}

/// Full HTTP surface: authenticated transaction routes plus open probes.
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.upload.max_bytes;

    let api = Router::new()
        .route(
            "/create",
            post(transactions::create_transaction).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/summary", get(transactions::get_summary))
        .route(
            "/:id",
            get(transactions::get_transaction_detail).patch(transactions::update_transaction),
        )
        .route("/", get(transactions::list_transactions))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .nest("/api/transactions", api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BatchConfig) -> Result<Self, AppError> {
        init_metrics();

        let store = Self::build_store(&config).await?;
        let state = AppState::new(config, store);

        let addr = format!("{}:{}", state.config.common.host, state.config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Batch transaction service listener bound");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    async fn build_store(config: &BatchConfig) -> Result<Arc<dyn TransactionStore>, AppError> {
        match (&config.store, &config.database) {
            (StoreBackend::Memory, _) => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Ok(Arc::new(InMemoryTransactionStore::new()))
            }
            (StoreBackend::Postgres, Some(database)) => {
                let store = PgTransactionStore::connect(
                    database.url.expose_secret(),
                    database.max_connections,
                    database.min_connections,
                    database.statement_timeout,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                store.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;

                Ok(Arc::new(store))
            }
            (StoreBackend::Postgres, None) => Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_URL is required for the postgres store"
            ))),
        }
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            service = "batch-transaction-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
