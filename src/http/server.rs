//! HTTP server setup and the SOAP endpoint.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener with graceful shutdown
//! - Run the SOAP pipeline: extract → process → acknowledge
//!
//! # Design Decisions
//! - The SOAP endpoint answers 200 with a success envelope on every path,
//!   including unreadable or oversized bodies; failures go to logs
//! - Processing runs to completion; only the store bounds its own waits
//! - Collaborators are built once in `HttpServer::new` and shared via state

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::ServiceConfig;
use crate::health;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::soap_response;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::purchases::{ProcessOutcome, PurchaseProcessor};
use crate::soap::{EnvelopeExtractor, ResponseBuilder};
use crate::storage::PurchaseStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<EnvelopeExtractor>,
    pub responder: ResponseBuilder,
    pub processor: PurchaseProcessor,
    pub max_body_size: usize,
    pub admin_api_key: Arc<str>,
}

impl AppState {
    pub fn store(&self) -> &Arc<dyn PurchaseStore> {
        self.processor.store()
    }
}

/// HTTP server for the purchases listener.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server over an already opened store.
    pub fn new(config: ServiceConfig, store: Arc<dyn PurchaseStore>) -> Self {
        let state = AppState {
            extractor: Arc::new(EnvelopeExtractor::new(
                config.soap.fallback_namespace.clone(),
            )),
            responder: ResponseBuilder::new(),
            processor: PurchaseProcessor::new(store),
            max_body_size: config.listener.max_body_size,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route(&config.listener.soap_path, post(soap_handler))
            .route("/health", get(health::health));

        if config.admin.enabled {
            router = router.merge(admin::admin_router(state.clone(), config.timeouts.request_secs));
        }

        router
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The configured router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            soap_path = %self.config.listener.soap_path,
            admin = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// SOAP endpoint. Always acknowledges with `true`.
async fn soap_handler(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();

    let (raw, readable) = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => (bytes, true),
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                error = %e,
                limit = state.max_body_size,
                "Failed to read SOAP request body, package lost"
            );
            (Bytes::new(), false)
        }
    };

    let descriptor = state.extractor.extract(&raw);
    let method = descriptor.method.map_or("unknown", |m| m.as_str());

    tracing::info!(
        request_id = %request_id,
        method,
        has_purchases = descriptor.payload.is_some(),
        namespace = %descriptor.namespace,
        soap_version = %descriptor.soap_version,
        body_len = raw.len(),
        "Received SOAP request"
    );
    metrics::record_request(method, descriptor.soap_version.as_str());

    let envelope = state.responder.for_request(&descriptor);

    let outcome = if readable {
        state.processor.process(&descriptor).await
    } else {
        ProcessOutcome::BodyUnreadable
    };

    metrics::record_outcome(outcome.label(), start_time);
    tracing::info!(
        request_id = %request_id,
        outcome = outcome.label(),
        elapsed = ?start_time.elapsed(),
        "Acknowledged with return=true"
    );

    soap_response(envelope)
}
