//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Common test fixtures and multipart builders for all crates

/// Boundary used by [`MultipartBody`]
pub const TEST_BOUNDARY: &str = "----fairgo-test-boundary-7MA4YWxkTrZu0gW";

/// Story text of exactly `len` characters
pub fn sample_story_text(len: usize) -> String {
    const SEED: &str = "The hearing was adjourned again and nobody explained why. ";
    SEED.chars().cycle().take(len).collect()
}

/// Builder for `multipart/form-data` request bodies
#[derive(Debug, Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain text field
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", TEST_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Append a file part
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", TEST_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", TEST_BOUNDARY)
    }

    /// Finish the body with the closing boundary
    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", TEST_BOUNDARY).as_bytes());
        self.body
    }
}
