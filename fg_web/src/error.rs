//! ABOUTME: API error type rendered as `{error}` or `{errors:[...]}` JSON bodies
//! ABOUTME: Maps core errors and validator output onto HTTP status codes

use crate::models::{ErrorResponse, ValidationErrorItem, ValidationErrorResponse};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
enum ApiErrorBody {
    Message(String),
    Fields(Vec<ValidationErrorItem>),
}

/// Error returned by handlers and middleware
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody::Message(message.into()),
        }
    }

    /// 400 listing every rejected field
    pub fn validation(items: Vec<ValidationErrorItem>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiErrorBody::Fields(items),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ApiErrorBody::Message(message) => write!(f, "{}: {}", self.status, message),
            ApiErrorBody::Fields(items) => {
                write!(f, "{}: {} invalid field(s)", self.status, items.len())
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        match &self.body {
            ApiErrorBody::Message(message) => {
                HttpResponse::build(self.status).json(ErrorResponse::new(message.clone()))
            }
            ApiErrorBody::Fields(items) => {
                HttpResponse::build(self.status).json(ValidationErrorResponse {
                    errors: items.clone(),
                })
            }
        }
    }
}

/// Generic mapping; details stay in the log, never in the body
impl From<fg_core::Error> for ApiError {
    fn from(error: fg_core::Error) -> Self {
        match error {
            fg_core::Error::NotFound(msg) => Self::not_found(msg),
            fg_core::Error::Validation(msg) => Self::bad_request(msg),
            other => {
                tracing::error!("Unhandled error: {}", other);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
