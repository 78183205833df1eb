//! Application assembly: routes, middleware, state and lifecycle.

use crate::config::InvoiceConfig;
use crate::handlers;
use crate::services::metrics::track_http_metrics;
use crate::services::{InvoiceAggregator, InvoiceStore, MongoStore};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use billing_core::error::AppError;
use billing_core::middleware::request_id::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub store: Arc<dyn InvoiceStore>,
    pub aggregator: InvoiceAggregator,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against MongoDB.
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;
        store.initialize_indexes().await?;
        Self::with_store(config, Arc::new(store)).await
    }

    /// Build the application over any store implementation. Tests use this
    /// with the in-memory store.
    pub async fn with_store(
        config: InvoiceConfig,
        store: Arc<dyn InvoiceStore>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            store: store.clone(),
            aggregator: InvoiceAggregator::new(store),
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Listening");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = app_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Full route set with the shared middleware stack.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/taxes",
            post(handlers::create_tax).get(handlers::list_taxes),
        )
        .route(
            "/taxes/:tax_id",
            get(handlers::get_tax)
                .put(handlers::update_tax)
                .delete(handlers::delete_tax),
        )
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route(
            "/invoices/:invoice_number",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route(
            "/invoices/:invoice_number/services",
            post(handlers::add_service),
        )
        .route(
            "/invoices/:invoice_number/services/:service_id",
            delete(handlers::remove_service),
        )
        .route(
            "/invoices/:invoice_number/document",
            get(handlers::invoice_document),
        )
        // route_layer so the route template is available as the path label
        .route_layer(from_fn(track_http_metrics))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
