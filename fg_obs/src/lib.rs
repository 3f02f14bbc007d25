//! ABOUTME: Observability services including health checks and metrics
//! ABOUTME: Provides monitoring endpoints and story pipeline counters

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, HttpResponse, HttpServer, Result as ActixResult,
};
use fg_core::Result;
use prometheus_client::{encoding::text::encode, metrics::counter::Counter, registry::Registry};
use serde_json::json;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Readiness gate that can be toggled to indicate service readiness
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    /// Starts not ready; flipped once the database answers
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Story pipeline counters exported to Prometheus
#[derive(Debug)]
pub struct Metrics {
    registry: Arc<Mutex<Registry>>,
    stories_submitted: Counter,
    evidence_uploads: Counter,
    evidence_upload_failures: Counter,
    list_fallbacks: Counter,
    status_updates: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let stories_submitted = Counter::default();
        registry.register(
            "stories_submitted",
            "Story submissions accepted for review",
            stories_submitted.clone(),
        );

        let evidence_uploads = Counter::default();
        registry.register(
            "evidence_uploads",
            "Evidence files written to object storage",
            evidence_uploads.clone(),
        );

        let evidence_upload_failures = Counter::default();
        registry.register(
            "evidence_upload_failures",
            "Evidence uploads that aborted a submission",
            evidence_upload_failures.clone(),
        );

        let list_fallbacks = Counter::default();
        registry.register(
            "story_list_fallbacks",
            "Story listings answered with sample data after a query failure",
            list_fallbacks.clone(),
        );

        let status_updates = Counter::default();
        registry.register(
            "story_status_updates",
            "Moderation status changes",
            status_updates.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            stories_submitted,
            evidence_uploads,
            evidence_upload_failures,
            list_fallbacks,
            status_updates,
        }
    }

    pub fn inc_stories_submitted(&self) {
        self.stories_submitted.inc();
    }

    pub fn inc_evidence_uploads(&self) {
        self.evidence_uploads.inc();
    }

    pub fn inc_evidence_upload_failures(&self) {
        self.evidence_upload_failures.inc();
    }

    pub fn inc_list_fallbacks(&self) {
        self.list_fallbacks.inc();
    }

    pub fn inc_status_updates(&self) {
        self.status_updates.inc();
    }

    pub fn list_fallbacks(&self) -> u64 {
        self.list_fallbacks.get()
    }

    pub fn stories_submitted(&self) -> u64 {
        self.stories_submitted.get()
    }

    pub fn encode(&self) -> Result<String> {
        let registry = self.registry.lock().map_err(|e| {
            fg_core::Error::Config(format!("Failed to lock metrics registry: {}", e))
        })?;

        let mut buffer = String::new();
        encode(&mut buffer, &registry)
            .map_err(|e| fg_core::Error::Config(format!("Failed to encode metrics: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state for observability endpoints
#[derive(Debug, Clone)]
pub struct ObsState {
    pub readiness: ReadinessGate,
    pub metrics: Arc<Metrics>,
}

impl ObsState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            readiness: ReadinessGate::new(),
            metrics,
        }
    }
}

impl Default for ObsState {
    fn default() -> Self {
        Self::new(Arc::new(Metrics::new()))
    }
}

/// Health endpoint handler
async fn health() -> ActixResult<HttpResponse> {
    tracing::debug!("Health check requested");
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok"
    })))
}

/// Readiness endpoint handler
async fn readiness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    let is_ready = state.readiness.is_ready();
    tracing::debug!("Readiness check requested, ready: {}", is_ready);

    if is_ready {
        Ok(HttpResponse::Ok().json(json!({
            "status": "ready"
        })))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(json!({
            "status": "not ready"
        })))
    }
}

/// Metrics endpoint handler
async fn metrics(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    match state.metrics.encode() {
        Ok(metrics_text) => Ok(HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(metrics_text)),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to encode metrics"
            })))
        }
    }
}

/// Create observability service factory
pub fn create_service(
    state: ObsState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Logger::default())
        .service(
            web::scope("")
                .route("/healthz", web::get().to(health))
                .route("/readyz", web::get().to(readiness))
                .route("/metrics", web::get().to(metrics)),
        )
}

/// Start observability server
pub async fn start_server(bind_addr: &str, state: ObsState) -> Result<()> {
    tracing::info!("Starting observability server on {}", bind_addr);

    HttpServer::new(move || create_service(state.clone()))
        .bind(bind_addr)
        .map_err(|e| fg_core::Error::Config(format!("Failed to bind server: {}", e)))?
        .run()
        .await
        .map_err(|e| fg_core::Error::Config(format!("Server error: {}", e)))?;

    Ok(())
}
