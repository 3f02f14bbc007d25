//! ABOUTME: Authentication middleware for JWT verification
//! ABOUTME: Reads the bearer header or auth cookie and attaches the caller to the request

use crate::{auth::JwtAuth, error::ApiError, models::Claims, AppState};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::{debug, warn};

/// Cookie carrying the JWT when no Authorization header is sent
pub const AUTH_COOKIE: &str = "auth_token";

/// Authentication middleware that requires a valid JWT
pub struct RequireAuth;

impl RequireAuth {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequireAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let Some((token, source)) = extract_token(&req) else {
                warn!(path = %req.path(), "Request without credentials");
                return Err(ApiError::unauthorized("Authentication required").into());
            };

            let Some(state) = req.app_data::<web::Data<AppState>>() else {
                warn!("Application state missing, cannot verify token");
                return Err(ApiError::unauthorized("Authentication required").into());
            };

            match JwtAuth::verify_token(&token, &state.jwt_secret) {
                Ok(claims) => {
                    debug!(
                        "JWT authentication successful for {} (via {})",
                        claims.sub, source
                    );
                    req.extensions_mut().insert(AuthUser::from_jwt(claims));
                    service.call(req).await
                }
                Err(e) => {
                    warn!("JWT verification failed: {}", e);
                    Err(ApiError::unauthorized("Invalid or expired token").into())
                }
            }
        })
    }
}

fn extract_token(req: &ServiceRequest) -> Option<(String, &'static str)> {
    if let Some(header) = req.headers().get("authorization") {
        if let Ok(value) = header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some((token.trim().to_string(), "header"));
            }
        }
    }

    req.cookie(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .map(|token| (token, "cookie"))
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

impl AuthUser {
    fn from_jwt(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// Helper function to extract authenticated user from HTTP request
pub fn get_http_auth_user(req: &actix_web::HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}
