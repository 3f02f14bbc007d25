//! ABOUTME: Story submission intake: multipart parsing, validation and sanitizing
//! ABOUTME: Turns a multipart form into a pending-story insert plus an optional evidence file

use crate::{
    error::{ApiError, ApiResult},
    models::ValidationErrorItem,
};
use actix_multipart::{Field, Multipart, MultipartError};
use bytes::{Bytes, BytesMut};
use fg_db::{CreateStoryRequest, Privacy};
use fg_storage::{allowed_filetypes_message, is_allowed_evidence};
use futures_util::StreamExt;
use std::collections::HashMap;
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

/// Only multipart part allowed to carry a file
pub const EVIDENCE_FIELD: &str = "evidence";

/// Characters of story text kept in the excerpt
pub const EXCERPT_CHARS: usize = 200;

/// Text part whose overflow is reported as a length validation error
const STORY_FIELD: &str = "story";

/// Size limits applied while reading a submission
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
    pub max_field_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_field_bytes: 1024 * 1024,
        }
    }
}

/// File attached in the `evidence` part
#[derive(Debug, Clone)]
pub struct EvidenceFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Text parts of the form; the first value sent for a name wins
#[derive(Debug, Default)]
pub struct SubmissionFields {
    values: HashMap<String, String>,
}

impl SubmissionFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.values.entry(name).or_insert(value);
    }
}

fn malformed(error: MultipartError) -> ApiError {
    warn!("Malformed multipart body: {}", error);
    ApiError::bad_request("Malformed multipart body")
}

async fn read_limited(field: &mut Field, max_bytes: usize, too_large: &str) -> ApiResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(ApiError::payload_too_large(too_large));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Read a text part; `None` when it outgrows `max_bytes`. The rest of the part is discarded.
async fn read_text(field: &mut Field, max_bytes: usize) -> ApiResult<Option<Bytes>> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if buf.len() + chunk.len() > max_bytes {
            drain(field).await?;
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf.freeze()))
}

async fn drain(field: &mut Field) -> ApiResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(malformed)?;
    }
    Ok(())
}

/// Read every part of the form. The evidence file is type-checked from its
/// headers before its body is read, and before any text field is validated.
///
/// A body that yields no parts at all (`--boundary--` only, or not multipart)
/// is read as an empty form so the field validation reports what is missing.
pub async fn read_submission(
    mut payload: Multipart,
    limits: &UploadLimits,
) -> ApiResult<(SubmissionFields, Option<EvidenceFile>)> {
    let mut fields = SubmissionFields::default();
    let mut evidence: Option<EvidenceFile> = None;
    let mut parts_seen = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) if parts_seen == 0 => {
                debug!("Multipart body has no parts: {}", e);
                break;
            }
            Err(e) => return Err(malformed(e)),
        };
        parts_seen += 1;

        let Some(name) = field.name().map(str::to_string) else {
            drain(&mut field).await?;
            continue;
        };
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match filename {
            None => match read_text(&mut field, limits.max_field_bytes).await? {
                Some(bytes) => {
                    let value = String::from_utf8(bytes.to_vec())
                        .map_err(|_| ApiError::bad_request("Form fields must be UTF-8 text"))?;
                    fields.insert(name, value);
                }
                // an empty story fails the length rule like any other overlong story
                None if name == STORY_FIELD => {
                    warn!(limit = limits.max_field_bytes, "Story part exceeded field limit");
                    fields.insert(name, String::new());
                }
                None => {
                    warn!(field = %name, "Rejected oversized form field");
                    return Err(ApiError::payload_too_large("Field value too long"));
                }
            },
            // browsers send an empty file part when nothing was chosen
            Some(filename) if filename.is_empty() => drain(&mut field).await?,
            Some(filename) => {
                if name != EVIDENCE_FIELD || evidence.is_some() {
                    warn!(field = %name, "Rejected unexpected file part");
                    return Err(ApiError::bad_request("Unexpected field"));
                }

                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_default();
                if !is_allowed_evidence(&filename, &content_type) {
                    warn!(filename = %filename, content_type = %content_type, "Rejected evidence file type");
                    return Err(ApiError::bad_request(allowed_filetypes_message()));
                }

                let data = read_limited(&mut field, limits.max_file_bytes, "File too large").await?;
                debug!(filename = %filename, bytes = data.len(), "Received evidence file");
                evidence = Some(EvidenceFile {
                    filename,
                    content_type,
                    data,
                });
            }
        }
    }

    Ok((fields, evidence))
}

/// Required fields, trimmed where the form rules trim them
#[derive(Debug, Validate)]
pub struct SubmissionInput {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Category is required."))]
    pub category: String,
    #[validate(length(
        min = 50,
        max = 10000,
        message = "Story must be between 50 and 10,000 characters."
    ))]
    pub story: String,
}

impl SubmissionInput {
    pub fn from_fields(fields: &SubmissionFields) -> Self {
        Self {
            name: fields.get("name").unwrap_or_default().trim().to_string(),
            email: fields.get("email").unwrap_or_default().to_string(),
            category: fields.get("category").unwrap_or_default().to_string(),
            story: fields.get("story").unwrap_or_default().trim().to_string(),
        }
    }

    /// Rejected fields in form order: name, email, category, story
    pub fn error_items(&self, errors: &ValidationErrors) -> Vec<ValidationErrorItem> {
        let field_errors = errors.field_errors();
        [
            ("name", &self.name),
            ("email", &self.email),
            ("category", &self.category),
            ("story", &self.story),
        ]
        .into_iter()
        .filter_map(|(path, value)| {
            let first = field_errors.get(path)?.first()?;
            let msg = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid value".to_string());
            Some(ValidationErrorItem::body_field(path, value, msg))
        })
        .collect()
    }

    /// Validate, then sanitize into a submission ready for storage
    pub fn check(self, fields: &SubmissionFields) -> ApiResult<ValidatedSubmission> {
        if let Err(errors) = self.validate() {
            let items = self.error_items(&errors);
            debug!(invalid = items.len(), "Submission failed validation");
            return Err(ApiError::validation(items));
        }

        let optional = |key: &str| fields.get(key).unwrap_or_default().to_string();

        Ok(ValidatedSubmission {
            name: html_escape(&self.name),
            email: normalize_email(&self.email),
            location: optional("location"),
            category: self.category,
            story: html_escape(&self.story),
            impact: optional("impact"),
            reforms: optional("reforms"),
            privacy: Privacy::from_form(fields.get("privacy")),
            contact: fields.get("contact") == Some("yes"),
        })
    }
}

/// Sanitized submission awaiting its evidence URL
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub name: String,
    pub email: String,
    pub location: String,
    pub category: String,
    pub story: String,
    pub impact: String,
    pub reforms: String,
    pub privacy: Privacy,
    pub contact: bool,
}

impl ValidatedSubmission {
    pub fn into_create_request(
        self,
        evidence_url: Option<String>,
        evidence_filename: Option<String>,
    ) -> CreateStoryRequest {
        CreateStoryRequest {
            display_name: display_name(&self.name, self.privacy),
            excerpt: excerpt(&self.story),
            name: self.name,
            email: self.email,
            location: self.location,
            category: self.category,
            story: self.story,
            impact: self.impact,
            reforms: self.reforms,
            privacy: self.privacy,
            contact: self.contact,
            evidence_url,
            evidence_filename,
        }
    }
}

/// Escape HTML-significant characters: `& < > " ' / \` and backtick
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

const GMAIL_DOMAINS: &[&str] = &["gmail.com", "googlemail.com"];

const ICLOUD_DOMAINS: &[&str] = &["icloud.com", "me.com"];

const OUTLOOK_DOMAINS: &[&str] = &[
    "hotmail.at", "hotmail.be", "hotmail.ca", "hotmail.cl", "hotmail.co.il", "hotmail.co.nz",
    "hotmail.co.th", "hotmail.co.uk", "hotmail.com", "hotmail.com.ar", "hotmail.com.au",
    "hotmail.com.br", "hotmail.com.gr", "hotmail.com.mx", "hotmail.com.pe", "hotmail.com.tr",
    "hotmail.com.vn", "hotmail.cz", "hotmail.de", "hotmail.dk", "hotmail.es", "hotmail.fr",
    "hotmail.hu", "hotmail.id", "hotmail.ie", "hotmail.in", "hotmail.it", "hotmail.jp",
    "hotmail.kr", "hotmail.lv", "hotmail.my", "hotmail.ph", "hotmail.pt", "hotmail.sa",
    "hotmail.sg", "hotmail.sk", "live.be", "live.co.uk", "live.com", "live.com.ar",
    "live.com.mx", "live.de", "live.es", "live.eu", "live.fr", "live.it", "live.nl", "msn.com",
    "outlook.at", "outlook.be", "outlook.cl", "outlook.co.il", "outlook.co.nz", "outlook.co.th",
    "outlook.com", "outlook.com.ar", "outlook.com.au", "outlook.com.br", "outlook.com.gr",
    "outlook.com.pe", "outlook.com.tr", "outlook.com.vn", "outlook.cz", "outlook.de",
    "outlook.dk", "outlook.es", "outlook.fr", "outlook.hu", "outlook.id", "outlook.ie",
    "outlook.in", "outlook.it", "outlook.jp", "outlook.kr", "outlook.lv", "outlook.my",
    "outlook.ph", "outlook.pt", "outlook.sa", "outlook.sg", "outlook.sk", "passport.com",
];

const YAHOO_DOMAINS: &[&str] = &[
    "rocketmail.com", "yahoo.ca", "yahoo.co.uk", "yahoo.com", "yahoo.de", "yahoo.fr",
    "yahoo.in", "yahoo.it", "ymail.com",
];

const YANDEX_DOMAINS: &[&str] = &[
    "yandex.ru", "yandex.ua", "yandex.kz", "yandex.com", "yandex.by", "ya.ru",
];

fn strip_plus_tag(local: &str) -> &str {
    local.split('+').next().unwrap_or(local)
}

/// Canonical mailbox form. The address is lower-cased, then provider rules apply:
///
/// * Gmail and Googlemail drop dots and `+tag`, and the domain becomes `gmail.com`.
/// * iCloud and Outlook/Hotmail/Live drop `+tag`.
/// * Yahoo drops the trailing `-tag`.
/// * Yandex domains become `yandex.ru`.
///
/// When a rule would leave the local part empty, the lower-cased address is kept.
pub fn normalize_email(email: &str) -> String {
    let lower = email.trim().to_lowercase();
    let Some((local, domain)) = lower.rsplit_once('@') else {
        return lower;
    };

    let (local, domain) = if GMAIL_DOMAINS.contains(&domain) {
        (strip_plus_tag(local).replace('.', ""), "gmail.com")
    } else if ICLOUD_DOMAINS.contains(&domain) || OUTLOOK_DOMAINS.contains(&domain) {
        (strip_plus_tag(local).to_string(), domain)
    } else if YAHOO_DOMAINS.contains(&domain) {
        let local = match local.rsplit_once('-') {
            Some((head, _)) => head,
            None => local,
        };
        (local.to_string(), domain)
    } else if YANDEX_DOMAINS.contains(&domain) {
        (local.to_string(), "yandex.ru")
    } else {
        return lower;
    };

    if local.is_empty() {
        return lower;
    }
    format!("{}@{}", local, domain)
}

/// "First L." for public stories with a multi-word name, the single word otherwise
pub fn display_name(name: &str, privacy: Privacy) -> String {
    if privacy != Privacy::Public {
        return "Anonymous".to_string();
    }

    let parts: Vec<&str> = name.split(' ').filter(|part| !part.is_empty()).collect();
    match parts.as_slice() {
        [] => "Anonymous".to_string(),
        [only] => only.to_string(),
        [first, .., last] => {
            let initial: String = last.chars().take(1).collect();
            format!("{} {}.", first, initial)
        }
    }
}

/// First 200 characters of the story followed by "..."
pub fn excerpt(story: &str) -> String {
    let head: String = story.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::sample_story_text;

    fn fields(pairs: &[(&str, &str)]) -> SubmissionFields {
        let mut fields = SubmissionFields::default();
        for (name, value) in pairs {
            fields.insert(name.to_string(), value.to_string());
        }
        fields
    }

    #[test]
    fn test_first_value_wins() {
        let fields = fields(&[("name", "First"), ("name", "Second")]);
        assert_eq!(fields.get("name"), Some("First"));
        assert_eq!(fields.get("email"), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("John Smith", Privacy::Public), "John S.");
        assert_eq!(display_name("Madonna", Privacy::Public), "Madonna");
        assert_eq!(display_name("Mary Jane Watson", Privacy::Public), "Mary W.");
        assert_eq!(display_name("John Smith", Privacy::Anonymous), "Anonymous");
        assert_eq!(display_name("Émile Zola", Privacy::Public), "Émile Z.");
        // only spaces separate words
        assert_eq!(display_name("John  Smith", Privacy::Public), "John S.");
        assert_eq!(display_name("John\tSmith", Privacy::Public), "John\tSmith");
        assert_eq!(display_name("Ana\nMaria Lopez", Privacy::Public), "Ana\nMaria L.");
    }

    #[test]
    fn test_excerpt() {
        let long = sample_story_text(300);
        let expected: String = long.chars().take(200).collect();
        assert_eq!(excerpt(&long), format!("{}...", expected));

        let short = sample_story_text(60);
        assert_eq!(excerpt(&short), format!("{}...", short));

        // counts characters, not bytes
        let accented = "é".repeat(250);
        assert_eq!(excerpt(&accented), format!("{}...", "é".repeat(200)));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;&#x2F;script&gt;"
        );
        assert_eq!(html_escape("Tom & Jerry's `cat` \\"), "Tom &amp; Jerry&#x27;s &#96;cat&#96; &#x5C;");
        assert_eq!(html_escape("plain text"), "plain text");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("Jane@Example.COM"), "jane@example.com");
        assert_eq!(
            normalize_email("John.Doe+court@GoogleMail.com"),
            "johndoe@gmail.com"
        );
        assert_eq!(normalize_email("a.b.c@gmail.com"), "abc@gmail.com");
        assert_eq!(
            normalize_email("first.last+tag@example.org"),
            "first.last+tag@example.org"
        );
    }

    #[test]
    fn test_normalize_email_provider_rules() {
        assert_eq!(normalize_email("Jane+court@Outlook.com"), "jane@outlook.com");
        assert_eq!(normalize_email("jane.doe+x@hotmail.co.uk"), "jane.doe@hotmail.co.uk");
        assert_eq!(normalize_email("Jane+court@live.com"), "jane@live.com");
        assert_eq!(normalize_email("jane+tag@iCloud.com"), "jane@icloud.com");
        assert_eq!(normalize_email("jane+tag@me.com"), "jane@me.com");
        assert_eq!(normalize_email("jane-doe-court@Yahoo.com"), "jane-doe@yahoo.com");
        assert_eq!(normalize_email("jane+tag@yahoo.com"), "jane+tag@yahoo.com");
        assert_eq!(normalize_email("Jane.Doe@yandex.kz"), "jane.doe@yandex.ru");
        assert_eq!(normalize_email("jane@ya.ru"), "jane@yandex.ru");
        // a rule that would empty the local part leaves the address alone
        assert_eq!(normalize_email("+court@outlook.com"), "+court@outlook.com");
        assert_eq!(normalize_email("-court@yahoo.com"), "-court@yahoo.com");
    }

    #[test]
    fn test_validation_messages_in_order() {
        let input = SubmissionInput::from_fields(&fields(&[
            ("story", "too short"),
            ("email", "not-an-email"),
            ("name", "   "),
        ]));
        let errors = input.validate().unwrap_err();
        let items = input.error_items(&errors);

        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "email", "category", "story"]);
        assert_eq!(items[0].msg, "Name is required.");
        assert_eq!(items[0].value, "");
        assert_eq!(items[1].msg, "A valid email is required.");
        assert_eq!(items[2].msg, "Category is required.");
        assert_eq!(
            items[3].msg,
            "Story must be between 50 and 10,000 characters."
        );
        assert_eq!(items[3].value, "too short");
    }

    #[test]
    fn test_story_length_bounds() {
        for (len, ok) in [(49, false), (50, true), (10_000, true), (10_001, false)] {
            let input = SubmissionInput::from_fields(&fields(&[
                ("name", "Jane Citizen"),
                ("email", "jane@example.com"),
                ("category", "legal-costs"),
                ("story", &sample_story_text(len)),
            ]));
            assert_eq!(input.validate().is_ok(), ok, "story of {} chars", len);
        }
    }

    #[test]
    fn test_check_sanitizes_and_derives() {
        let story = format!("  {}  ", sample_story_text(80));
        let form = fields(&[
            ("name", "  Jane <b>Citizen</b> "),
            ("email", "Jane.Citizen+stories@gmail.com"),
            ("category", "evidence"),
            ("story", &story),
            ("privacy", "public"),
            ("contact", "yes"),
        ]);

        let submission = SubmissionInput::from_fields(&form).check(&form).unwrap();
        assert_eq!(submission.name, "Jane &lt;b&gt;Citizen&lt;&#x2F;b&gt;");
        assert_eq!(submission.email, "janecitizen@gmail.com");
        assert_eq!(submission.story, sample_story_text(80));
        assert_eq!(submission.location, "");
        assert_eq!(submission.privacy, Privacy::Public);
        assert!(submission.contact);

        let request = submission.into_create_request(None, None);
        // the initial is taken from the escaped name
        assert_eq!(request.display_name, "Jane &.");
        assert_eq!(request.excerpt, format!("{}...", sample_story_text(80)));
    }

    #[test]
    fn test_contact_and_privacy_defaults() {
        let form = fields(&[
            ("name", "Jane Citizen"),
            ("email", "jane@example.com"),
            ("category", "evidence"),
            ("story", &sample_story_text(60)),
            ("contact", "on"),
            ("privacy", "Public"),
        ]);

        let submission = SubmissionInput::from_fields(&form).check(&form).unwrap();
        assert!(!submission.contact);
        assert_eq!(submission.privacy, Privacy::Anonymous);
        assert_eq!(
            submission.into_create_request(None, None).display_name,
            "Anonymous"
        );
    }
}
