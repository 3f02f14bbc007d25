//! ABOUTME: Story endpoints: public listing and reading, submission, moderation
//! ABOUTME: Mounted under /api/stories; the status change requires an admin token

use crate::{
    error::{ApiError, ApiResult},
    middleware::{auth::get_http_auth_user, auth::RequireAuth, rbac::RequireRole},
    models::{
        ListStoriesQuery, ListStoriesResponse, Pagination, PublicStory, StatusUpdateResponse,
        StoryCard, StoryRecord, SubmitStoryResponse, UpdateStatusRequest,
    },
    submission::{read_submission, SubmissionInput},
    AppState,
};
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use fg_core::{now_iso8601, Id, MonotonicTimer};
use fg_db::{StoryRepository, StoryStatus};
use fg_storage::new_evidence_object_name;
use tracing::{error, info, warn};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

const SUBMITTED_MESSAGE: &str =
    "Thank you for sharing your story. It will be reviewed and published soon.";

fn parse_number(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

impl ListStoriesQuery {
    /// Never fails; unreadable query strings fall back to the defaults
    pub fn from_request(req: &HttpRequest) -> Self {
        web::Query::<ListStoriesQuery>::from_query(req.query_string())
            .map(web::Query::into_inner)
            .unwrap_or_default()
    }

    pub fn page(&self) -> i64 {
        parse_number(self.page.as_deref(), DEFAULT_PAGE).max(1)
    }

    pub fn limit(&self) -> i64 {
        parse_number(self.limit.as_deref(), DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

/// Served when the database cannot answer a listing
pub fn sample_listing() -> ListStoriesResponse {
    let now = now_iso8601();
    let sample = |display_name: &str, location: &str, category: &str, excerpt: &str| StoryCard {
        id: None,
        display_name: display_name.to_string(),
        location: location.to_string(),
        category: category.to_string(),
        excerpt: excerpt.to_string(),
        created_at: now.clone(),
    };

    ListStoriesResponse {
        stories: vec![
            sample(
                "Margaret K.",
                "Brisbane, QLD",
                "legal-costs",
                "After three years fighting a simple property dispute, I spent my life savings on legal fees...",
            ),
            sample(
                "David R.",
                "Sydney, NSW",
                "evidence",
                "Key evidence in my case mysteriously disappeared from the court file...",
            ),
        ],
        pagination: Pagination {
            page: 1,
            limit: 10,
            total: 2,
            pages: 1,
        },
    }
}

async fn fetch_listing(
    state: &AppState,
    category: Option<&str>,
    page: i64,
    limit: i64,
) -> fg_core::Result<ListStoriesResponse> {
    let repo = StoryRepository::new(state.db.pool());
    let offset = (page - 1).saturating_mul(limit);

    let stories = repo.list_published(category, offset, limit).await?;
    let total = repo.count_published(category).await?;

    Ok(ListStoriesResponse {
        stories: stories.into_iter().map(StoryCard::from).collect(),
        pagination: Pagination::new(page, limit, total),
    })
}

/// List published stories, newest first
#[utoipa::path(
    get,
    path = "/api/stories",
    tag = "stories",
    params(ListStoriesQuery),
    responses(
        (status = 200, description = "Page of published stories", body = ListStoriesResponse),
    )
)]
pub async fn list_stories(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let query = ListStoriesQuery::from_request(&req);
    let (page, limit) = (query.page(), query.limit());
    let category = query.category();

    match fetch_listing(&state, category, page, limit).await {
        Ok(listing) => {
            info!(
                page,
                limit,
                category = category.unwrap_or(""),
                returned = listing.stories.len(),
                "Listed published stories"
            );
            HttpResponse::Ok().json(listing)
        }
        Err(e) => {
            warn!("Story listing failed, serving sample stories: {}", e);
            state.metrics.inc_list_fallbacks();
            HttpResponse::Ok().json(sample_listing())
        }
    }
}

/// Fetch one published story
#[utoipa::path(
    get,
    path = "/api/stories/{id}",
    tag = "stories",
    params(("id" = String, Path, description = "Story id")),
    responses(
        (status = 200, description = "Published story", body = PublicStory),
        (status = 404, description = "Story not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_story(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if !Id::is_valid(&id) {
        return Err(ApiError::not_found("Story not found"));
    }

    let repo = StoryRepository::new(state.db.pool());
    match repo.find_published(&id).await {
        Ok(Some(story)) => Ok(HttpResponse::Ok().json(PublicStory::from(story))),
        Ok(None) => Err(ApiError::not_found("Story not found")),
        Err(e) => {
            error!(story_id = %id, "Failed to fetch story: {}", e);
            Err(ApiError::internal_server_error("Failed to fetch story"))
        }
    }
}

/// Submit a story for review, optionally with one evidence file
#[utoipa::path(
    post,
    path = "/api/stories",
    tag = "stories",
    request_body(content = SubmitStoryForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Story accepted for review", body = SubmitStoryResponse),
        (status = 400, description = "Invalid form or file", body = ValidationErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Upload or storage failure", body = ErrorResponse),
    )
)]
pub async fn submit_story(
    state: web::Data<AppState>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let timer = MonotonicTimer::new();
    let (fields, evidence) = read_submission(payload, &state.upload_limits).await?;
    let submission = SubmissionInput::from_fields(&fields).check(&fields)?;

    let mut uploaded: Option<String> = None;
    let (evidence_url, evidence_filename) = match evidence {
        Some(file) => {
            let object_name = new_evidence_object_name(&file.filename);
            match state
                .evidence
                .put_evidence(&object_name, &file.content_type, file.data)
                .await
            {
                Ok(stored) => {
                    state.metrics.inc_evidence_uploads();
                    info!(object = %stored.name, bytes = stored.size, "Uploaded evidence");
                    uploaded = Some(stored.name);
                    (Some(stored.url), Some(file.filename))
                }
                Err(e) => {
                    state.metrics.inc_evidence_upload_failures();
                    error!(object = %object_name, "Evidence upload failed: {}", e);
                    return Err(ApiError::internal_server_error(
                        "Failed to upload evidence file. Please try again.",
                    ));
                }
            }
        }
        None => (None, None),
    };

    let request = submission.into_create_request(evidence_url, evidence_filename);
    let category = request.category.clone();
    let repo = StoryRepository::new(state.db.pool());

    match repo.create(request).await {
        Ok(story) => {
            state.metrics.inc_stories_submitted();
            info!(
                story_id = %story.id,
                category = %category,
                elapsed_ms = timer.elapsed_ms(),
                "Story submitted for review"
            );
            Ok(HttpResponse::Created().json(SubmitStoryResponse {
                message: SUBMITTED_MESSAGE.to_string(),
                id: story.id,
            }))
        }
        Err(e) => {
            error!("Failed to save story: {}", e);
            if let Some(object_name) = uploaded {
                if let Err(cleanup) = state.evidence.delete_evidence(&object_name).await {
                    warn!(object = %object_name, "Orphaned evidence object: {}", cleanup);
                }
            }
            Err(ApiError::internal_server_error(
                "Failed to submit story. Please try again.",
            ))
        }
    }
}

/// Move a story between pending, published and rejected
#[utoipa::path(
    put,
    path = "/api/stories/{id}/status",
    tag = "moderation",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Story id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = StatusUpdateResponse),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Story not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn update_story_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let status = body
        .status
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(|value| value.parse::<StoryStatus>().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid status"))?;

    if !Id::is_valid(&id) {
        return Err(ApiError::not_found("Story not found"));
    }

    let repo = StoryRepository::new(state.db.pool());
    match repo.update_status(&id, status).await {
        Ok(Some(story)) => {
            state.metrics.inc_status_updates();
            let moderator = get_http_auth_user(&req).map(|user| user.id).unwrap_or_default();
            info!(story_id = %story.id, status = %status, moderator = %moderator, "Story status updated");
            Ok(HttpResponse::Ok().json(StatusUpdateResponse {
                message: "Story status updated".to_string(),
                story: StoryRecord::from(story),
            }))
        }
        Ok(None) => Err(ApiError::not_found("Story not found")),
        Err(e) => {
            error!(story_id = %id, "Failed to update story status: {}", e);
            Err(ApiError::internal_server_error("Failed to update story"))
        }
    }
}

/// Configure story routes
pub fn configure_story_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/stories")
            .route("", web::get().to(list_stories))
            .route("", web::post().to(submit_story))
            .route("/{id}", web::get().to(get_story))
            .route(
                "/{id}/status",
                web::put()
                    .to(update_story_status)
                    .wrap(RequireRole::admin())
                    .wrap(RequireAuth::new()),
            ),
    );
}
