//! ABOUTME: Web API layer for story submission and moderation
//! ABOUTME: Provides REST endpoints, shared state and OpenAPI documentation

use actix_web::{web, App, HttpResponse, HttpServer};
use fg_core::Result;
use fg_db::Db;
use fg_obs::Metrics;
use fg_storage::EvidenceStore;
use std::fmt;
use std::sync::Arc;
use utoipa::OpenApi;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod submission;


use routes::stories;
pub use submission::UploadLimits;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub evidence: Arc<dyn EvidenceStore>,
    pub metrics: Arc<Metrics>,
    pub jwt_secret: String,
    pub upload_limits: UploadLimits,
    /// Maximum JSON body size in bytes
    pub json_limit: usize,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("evidence_bucket", &self.evidence.bucket())
            .field("jwt_secret", &"[REDACTED]")
            .field("upload_limits", &self.upload_limits)
            .field("json_limit", &self.json_limit)
            .finish()
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        stories::list_stories,
        stories::get_story,
        stories::submit_story,
        stories::update_story_status,
    ),
    components(
        schemas(
            models::StoryCard,
            models::Pagination,
            models::ListStoriesResponse,
            models::PublicStory,
            models::StoryRecord,
            models::SubmitStoryForm,
            models::SubmitStoryResponse,
            models::UpdateStatusRequest,
            models::StatusUpdateResponse,
            models::ErrorResponse,
            models::ValidationErrorItem,
            models::ValidationErrorResponse,
        ),
    ),
    tags(
        (name = "stories", description = "Public story endpoints"),
        (name = "moderation", description = "Admin moderation endpoints"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Create the main web application service factory
pub fn create_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default()
        .limit(state.json_limit)
        .error_handler(|err, _req| {
            tracing::warn!("Rejected JSON body: {}", err);
            error::ApiError::bad_request("Invalid JSON body").into()
        });

    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config)
        .wrap(actix_web::middleware::Logger::default())
        .route("/api-docs/openapi.json", web::get().to(openapi_json))
        .configure(stories::configure_story_routes)
}

/// Start the web server
pub async fn start_server(bind_addr: &str, state: AppState) -> Result<()> {
    tracing::info!("Starting web server on {}", bind_addr);

    HttpServer::new(move || create_app(state.clone()))
        .bind(bind_addr)
        .map_err(|e| fg_core::Error::Config(format!("Failed to bind web server: {}", e)))?
        .run()
        .await
        .map_err(|e| fg_core::Error::Config(format!("Web server error: {}", e)))?;

    Ok(())
}
