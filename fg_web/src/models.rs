//! ABOUTME: Data models for the stories API with OpenAPI schemas
//! ABOUTME: Defines request/response structures and the public/admin story views

use fg_db::{Story, StorySummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// Query string for the public listing; every value is parsed leniently
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListStoriesQuery {
    /// Page number, 1-based (default 1)
    #[param(value_type = Option<i64>, example = 1)]
    pub page: Option<String>,
    /// Page size, clamped to 1..=100 (default 10)
    #[param(value_type = Option<i64>, example = 10)]
    pub limit: Option<String>,
    /// Only stories in this category
    pub category: Option<String>,
}

/// One entry of the public listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub display_name: String,
    pub location: String,
    pub category: String,
    pub excerpt: String,
    pub created_at: String,
}

impl From<StorySummary> for StoryCard {
    fn from(summary: StorySummary) -> Self {
        Self {
            id: Some(summary.id),
            display_name: summary.display_name,
            location: summary.location,
            category: summary.category,
            excerpt: summary.excerpt,
            created_at: summary.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListStoriesResponse {
    pub stories: Vec<StoryCard>,
    pub pagination: Pagination,
}

/// Published story as shown to the public; the author's name and email are withheld
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicStory {
    pub id: String,
    pub location: String,
    pub category: String,
    pub story: String,
    pub impact: String,
    pub reforms: String,
    #[schema(example = "public")]
    pub privacy: String,
    pub display_name: String,
    pub contact: bool,
    #[schema(example = "published")]
    pub status: String,
    pub excerpt: String,
    pub evidence_url: Option<String>,
    pub evidence_filename: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Story> for PublicStory {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            location: story.location,
            category: story.category,
            story: story.story,
            impact: story.impact,
            reforms: story.reforms,
            privacy: story.privacy.as_str().to_string(),
            display_name: story.display_name,
            contact: story.contact,
            status: story.status.as_str().to_string(),
            excerpt: story.excerpt,
            evidence_url: story.evidence_url,
            evidence_filename: story.evidence_filename,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Complete stored record, returned to moderators
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: String,
    pub category: String,
    pub story: String,
    pub impact: String,
    pub reforms: String,
    pub privacy: String,
    pub display_name: String,
    pub contact: bool,
    pub status: String,
    pub excerpt: String,
    pub evidence_url: Option<String>,
    pub evidence_filename: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Story> for StoryRecord {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            name: story.name,
            email: story.email,
            location: story.location,
            category: story.category,
            story: story.story,
            impact: story.impact,
            reforms: story.reforms,
            privacy: story.privacy.as_str().to_string(),
            display_name: story.display_name,
            contact: story.contact,
            status: story.status.as_str().to_string(),
            excerpt: story.excerpt,
            evidence_url: story.evidence_url,
            evidence_filename: story.evidence_filename,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Multipart form accepted by the submission endpoint (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SubmitStoryForm {
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub category: String,
    /// 50 to 10,000 characters
    pub story: String,
    pub impact: Option<String>,
    pub reforms: Option<String>,
    /// "public" shows a shortened name, anything else is anonymous
    pub privacy: Option<String>,
    /// "yes" when the author agrees to be contacted
    pub contact: Option<String>,
    /// jpeg, jpg, png, pdf, doc or docx; at most 10 MB
    #[schema(value_type = Option<String>, format = Binary)]
    pub evidence: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitStoryResponse {
    pub message: String,
    pub id: String,
}

/// Body of a moderation status change
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of pending, published, rejected
    #[serde(default)]
    #[schema(value_type = String, example = "published")]
    pub status: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub story: StoryRecord,
}

/// Standard error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One rejected form field
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub msg: String,
    pub path: String,
    pub location: String,
}

impl ValidationErrorItem {
    pub fn body_field(path: &str, value: &str, msg: impl Into<String>) -> Self {
        Self {
            kind: "field".to_string(),
            value: value.to_string(),
            msg: msg.into(),
            path: path.to_string(),
            location: "body".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub errors: Vec<ValidationErrorItem>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // moderator id
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Moderator roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        match role.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
