//! ABOUTME: Integration tests for the story repository against a real SQLite file
//! ABOUTME: Covers insert defaults, published-only reads, paging order and status moves

use fg_db::{CreateStoryRequest, Db, Privacy, StoryRepository, StoryStatus};
use tempfile::TempDir;
use test_support::sample_story_text;

async fn create_test_db() -> (TempDir, Db) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("stories.db");
    let db = Db::new(&db_path.to_string_lossy(), 2)
        .await
        .expect("Failed to create test database");
    (temp_dir, db)
}

fn request(category: &str) -> CreateStoryRequest {
    let story = sample_story_text(120);
    CreateStoryRequest {
        name: "Jane Citizen".to_string(),
        email: "jane@example.com".to_string(),
        location: "Hobart, TAS".to_string(),
        category: category.to_string(),
        excerpt: format!("{}...", &story),
        story,
        impact: String::new(),
        reforms: String::new(),
        privacy: Privacy::Public,
        display_name: "Jane C.".to_string(),
        contact: true,
        evidence_url: None,
        evidence_filename: None,
    }
}

#[tokio::test]
async fn test_create_starts_pending() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let story = repo.create(request("legal-costs")).await.unwrap();

    assert!(fg_core::Id::is_valid(&story.id));
    assert_eq!(story.status, StoryStatus::Pending);
    assert_eq!(story.privacy, Privacy::Public);
    assert!(story.contact);
    assert!(story.evidence_url.is_none());
    assert_eq!(story.created_at, story.updated_at);

    let found = repo.find_by_id(&story.id).await.unwrap().unwrap();
    assert_eq!(found.email, "jane@example.com");
}

#[tokio::test]
async fn test_find_published_hides_unpublished() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let story = repo.create(request("evidence")).await.unwrap();
    assert!(repo.find_published(&story.id).await.unwrap().is_none());

    repo.update_status(&story.id, StoryStatus::Published)
        .await
        .unwrap();
    assert!(repo.find_published(&story.id).await.unwrap().is_some());

    repo.update_status(&story.id, StoryStatus::Rejected)
        .await
        .unwrap();
    assert!(repo.find_published(&story.id).await.unwrap().is_none());

    assert!(repo.find_published("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_published_filters_and_orders() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let mut published = Vec::new();
    for category in ["legal-costs", "evidence", "legal-costs"] {
        let story = repo.create(request(category)).await.unwrap();
        repo.update_status(&story.id, StoryStatus::Published)
            .await
            .unwrap();
        published.push(story.id);
    }
    // stays out of every listing
    repo.create(request("legal-costs")).await.unwrap();
    let rejected = repo.create(request("evidence")).await.unwrap();
    repo.update_status(&rejected.id, StoryStatus::Rejected)
        .await
        .unwrap();

    let all = repo.list_published(None, 0, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, published[2], "newest first");
    assert_eq!(all[2].id, published[0]);
    assert_eq!(repo.count_published(None).await.unwrap(), 3);

    let legal = repo.list_published(Some("legal-costs"), 0, 10).await.unwrap();
    assert_eq!(legal.len(), 2);
    assert!(legal.iter().all(|s| s.category == "legal-costs"));
    assert_eq!(repo.count_published(Some("legal-costs")).await.unwrap(), 2);

    let evidence = repo.list_published(Some("evidence"), 0, 10).await.unwrap();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].id, published[1]);

    let second_page = repo.list_published(None, 2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, published[0]);

    assert!(repo
        .list_published(Some("unknown"), 0, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_update_status_touches_updated_at() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let story = repo.create(request("legal-costs")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let updated = repo
        .update_status(&story.id, StoryStatus::Published)
        .await
        .unwrap()
        .expect("story should exist");

    assert_eq!(updated.status, StoryStatus::Published);
    assert_eq!(updated.created_at, story.created_at);
    assert!(updated.updated_at > story.updated_at);
}

#[tokio::test]
async fn test_update_status_unknown_id() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let result = repo
        .update_status("01ARZ3NDEKTSV4RRFFQ69G5FAV", StoryStatus::Published)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_delete_story() {
    let (_dir, db) = create_test_db().await;
    let repo = StoryRepository::new(db.pool());

    let story = repo.create(request("legal-costs")).await.unwrap();
    assert!(repo.delete(&story.id).await.unwrap());
    assert!(!repo.delete(&story.id).await.unwrap());
    assert!(repo.find_by_id(&story.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_queries_fail_after_close() {
    let (_dir, db) = create_test_db().await;
    db.close().await;

    let repo = StoryRepository::new(db.pool());
    assert!(repo.list_published(None, 0, 10).await.is_err());
    assert!(repo.count_published(None).await.is_err());
}
