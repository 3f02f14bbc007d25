//! ABOUTME: End-to-end smoke test for the fairgo service
//! ABOUTME: Submits a story with evidence, publishes it, reads it back and checks metrics

use actix_web::{http::header, test};
use fg_config::Config;
use fg_db::Db;
use fg_obs::{Metrics, ObsState};
use fg_storage::BucketStore;
use fg_web::{auth::JwtAuth, models::Role, AppState, UploadLimits};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use test_support::{sample_story_text, MultipartBody};

struct E2ETestSetup {
    #[allow(dead_code)]
    temp_dir: TempDir,
    state: AppState,
    metrics: Arc<Metrics>,
}

impl E2ETestSetup {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir
            .path()
            .join("e2e.db")
            .to_string_lossy()
            .to_string();
        config.security.jwt_secret = "e2e_jwt_secret_with_at_least_32_chars".to_string();
        config.storage.backend = "memory".to_string();

        let db = Db::new(&config.database.path, config.database.pool_size)
            .await
            .expect("database");
        db.health_check().await.expect("healthy database");

        let metrics = Arc::new(Metrics::new());
        let state = AppState {
            db,
            evidence: Arc::new(BucketStore::in_memory(&config.storage.bucket)),
            metrics: Arc::clone(&metrics),
            jwt_secret: config.security.jwt_secret.clone(),
            upload_limits: UploadLimits {
                max_file_bytes: config.uploads.max_file_bytes,
                max_field_bytes: config.uploads.max_field_bytes,
            },
            json_limit: config.server.json_limit,
        };

        Self {
            temp_dir,
            state,
            metrics,
        }
    }
}

#[actix_web::test]
async fn test_story_lifecycle() {
    let setup = E2ETestSetup::new().await;
    let token = JwtAuth::create_token("e2e-moderator", Role::Admin, &setup.state.jwt_secret)
        .expect("token");
    let app = test::init_service(fg_web::create_app(setup.state.clone())).await;

    // Submit with evidence
    let form = MultipartBody::new()
        .text("name", "Margaret Kelly")
        .text("email", "margaret@example.com")
        .text("location", "Brisbane, QLD")
        .text("category", "legal-costs")
        .text("story", &sample_story_text(400))
        .text("privacy", "public")
        .text("contact", "yes")
        .file("evidence", "invoice.png", "image/png", b"\x89PNG\r\n");
    let req = test::TestRequest::post()
        .uri("/api/stories")
        .insert_header((header::CONTENT_TYPE, MultipartBody::content_type()))
        .set_payload(form.build())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let id = body["id"].as_str().expect("id").to_string();

    // Pending stories stay hidden
    let req = test::TestRequest::get().uri("/api/stories").to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["pagination"]["total"], 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/stories/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // Publish
    let req = test::TestRequest::put()
        .uri(&format!("/api/stories/{}/status", id))
        .insert_header(("authorization", format!("Bearer {}", token)))
        .set_json(json!({ "status": "published" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["story"]["status"], "published");
    assert_eq!(body["story"]["email"], "margaret@example.com");

    // Now public
    let req = test::TestRequest::get()
        .uri("/api/stories?category=legal-costs")
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["stories"][0]["id"], id);
    assert_eq!(body["stories"][0]["displayName"], "Margaret K.");
    assert_eq!(body["stories"][0]["location"], "Brisbane, QLD");

    let req = test::TestRequest::get()
        .uri(&format!("/api/stories/{}", id))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["contact"], true);
    assert!(body["evidenceUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://storage.googleapis.com/fair-go-justice-evidence/evidence-"));
    assert_eq!(body["evidenceFilename"], "invoice.png");
    assert!(body.get("email").is_none());

    // Counters exported by the observability server
    let obs = test::init_service(fg_obs::create_service(ObsState::new(Arc::clone(
        &setup.metrics,
    ))))
    .await;
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let text = test::read_body(test::call_service(&obs, req).await).await;
    let text = std::str::from_utf8(&text).unwrap();
    assert!(text.contains("stories_submitted_total 1"));
    assert!(text.contains("evidence_uploads_total 1"));
    assert!(text.contains("story_status_updates_total 1"));
    assert!(text.contains("story_list_fallbacks_total 0"));
}
