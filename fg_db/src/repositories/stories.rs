//! ABOUTME: Story repository for community submissions and moderation
//! ABOUTME: Inserts pending stories, pages published ones, and moves status

use fg_core::{time::now_iso8601, Error, Id, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Moderation state of a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StoryStatus {
    Pending,
    Published,
    Rejected,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Pending => "pending",
            StoryStatus::Published => "published",
            StoryStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for StoryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(StoryStatus::Pending),
            "published" => Ok(StoryStatus::Published),
            "rejected" => Ok(StoryStatus::Rejected),
            other => Err(Error::Validation(format!("Invalid status: {}", other))),
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the author agreed to be named publicly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Anonymous,
}

impl Privacy {
    /// Anything other than an explicit "public" stays anonymous
    pub fn from_form(value: Option<&str>) -> Self {
        match value {
            Some("public") => Privacy::Public,
            _ => Privacy::Anonymous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Anonymous => "anonymous",
        }
    }
}

/// Full story record, including the author's private contact details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: String,
    pub category: String,
    pub story: String,
    pub impact: String,
    pub reforms: String,
    pub privacy: Privacy,
    pub display_name: String,
    pub contact: bool,
    pub status: StoryStatus,
    pub excerpt: String,
    pub evidence_url: Option<String>,
    pub evidence_filename: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Projection used by the public listing
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub id: String,
    pub display_name: String,
    pub location: String,
    pub category: String,
    pub excerpt: String,
    pub created_at: String,
}

/// Request to insert a new submission; status always starts as pending
#[derive(Debug, Clone)]
pub struct CreateStoryRequest {
    pub name: String,
    pub email: String,
    pub location: String,
    pub category: String,
    pub story: String,
    pub impact: String,
    pub reforms: String,
    pub privacy: Privacy,
    pub display_name: String,
    pub contact: bool,
    pub excerpt: String,
    pub evidence_url: Option<String>,
    pub evidence_filename: Option<String>,
}

const STORY_COLUMNS: &str = "id, name, email, location, category, story, impact, reforms, privacy, \
     display_name, contact, status, excerpt, evidence_url, evidence_filename, created_at, updated_at";

pub struct StoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn create(&self, request: CreateStoryRequest) -> Result<Story> {
        let id = Id::new().to_string();
        let now = now_iso8601();

        let query = format!(
            r#"
            INSERT INTO stories (id, name, email, location, category, story, impact, reforms, privacy,
                                 display_name, contact, status, excerpt, evidence_url, evidence_filename,
                                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            RETURNING {}
            "#,
            STORY_COLUMNS
        );

        let story = sqlx::query_as::<_, Story>(&query)
            .bind(&id)
            .bind(&request.name)
            .bind(&request.email)
            .bind(&request.location)
            .bind(&request.category)
            .bind(&request.story)
            .bind(&request.impact)
            .bind(&request.reforms)
            .bind(request.privacy)
            .bind(&request.display_name)
            .bind(request.contact)
            .bind(StoryStatus::Pending)
            .bind(&request.excerpt)
            .bind(&request.evidence_url)
            .bind(&request.evidence_filename)
            .bind(&now)
            .bind(&now)
            .fetch_one(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to create story: {}", e)))?;

        debug!(story_id = %story.id, "Story inserted");
        Ok(story)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Story>> {
        let query = format!("SELECT {} FROM stories WHERE id = ?1", STORY_COLUMNS);

        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find story: {}", e)))
    }

    /// Look up a story only if it has been published
    pub async fn find_published(&self, id: &str) -> Result<Option<Story>> {
        let query = format!(
            "SELECT {} FROM stories WHERE id = ?1 AND status = ?2",
            STORY_COLUMNS
        );

        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(StoryStatus::Published)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to find published story: {}", e)))
    }

    /// Newest-first page of published stories, optionally within one category
    #[instrument(skip(self))]
    pub async fn list_published(
        &self,
        category: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StorySummary>> {
        let stories = if let Some(category) = category {
            sqlx::query_as::<_, StorySummary>(
                r#"
                SELECT id, display_name, location, category, excerpt, created_at
                FROM stories WHERE status = ?1 AND category = ?2
                ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4
                "#,
            )
            .bind(StoryStatus::Published)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await
        } else {
            sqlx::query_as::<_, StorySummary>(
                r#"
                SELECT id, display_name, location, category, excerpt, created_at
                FROM stories WHERE status = ?1
                ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3
                "#,
            )
            .bind(StoryStatus::Published)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await
        };

        stories.map_err(|e| Error::Database(format!("Failed to list stories: {}", e)))
    }

    pub async fn count_published(&self, category: Option<&str>) -> Result<i64> {
        let count = if let Some(category) = category {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM stories WHERE status = ?1 AND category = ?2",
            )
            .bind(StoryStatus::Published)
            .bind(category)
            .fetch_one(self.pool)
            .await
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stories WHERE status = ?1")
                .bind(StoryStatus::Published)
                .fetch_one(self.pool)
                .await
        };

        count.map_err(|e| Error::Database(format!("Failed to count stories: {}", e)))
    }

    /// Move a story to `status`; `None` when the id is unknown
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &str, status: StoryStatus) -> Result<Option<Story>> {
        let now = now_iso8601();
        let query = format!(
            "UPDATE stories SET status = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {}",
            STORY_COLUMNS
        );

        sqlx::query_as::<_, Story>(&query)
            .bind(status)
            .bind(&now)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update story status: {}", e)))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete story: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("pending".parse::<StoryStatus>().unwrap(), StoryStatus::Pending);
        assert_eq!(
            "published".parse::<StoryStatus>().unwrap(),
            StoryStatus::Published
        );
        assert_eq!(
            "rejected".parse::<StoryStatus>().unwrap(),
            StoryStatus::Rejected
        );
        assert!("Published".parse::<StoryStatus>().is_err());
        assert!("archived".parse::<StoryStatus>().is_err());
        assert!("".parse::<StoryStatus>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StoryStatus::Pending.to_string(), "pending");
        assert_eq!(StoryStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_privacy_from_form() {
        assert_eq!(Privacy::from_form(Some("public")), Privacy::Public);
        assert_eq!(Privacy::from_form(Some("anonymous")), Privacy::Anonymous);
        assert_eq!(Privacy::from_form(Some("PUBLIC")), Privacy::Anonymous);
        assert_eq!(Privacy::from_form(None), Privacy::Anonymous);
    }
}
