//! ABOUTME: Role-based access control middleware for authorization
//! ABOUTME: Enforces role-based permissions on moderation endpoints

use crate::{error::ApiError, middleware::auth::AuthUser, models::Role};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::{debug, warn};

/// RBAC middleware that requires specific roles
pub struct RequireRole {
    required_roles: Vec<Role>,
}

impl RequireRole {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            required_roles: roles,
        }
    }

    /// Require admin role
    pub fn admin() -> Self {
        Self::new(vec![Role::Admin])
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            required_roles: self.required_roles.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    required_roles: Vec<Role>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
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
        let required_roles = self.required_roles.clone();

        Box::pin(async move {
            // scope the extensions borrow
            let auth_user = {
                let extensions = req.extensions();
                extensions.get::<AuthUser>().cloned()
            };

            let Some(auth_user) = auth_user else {
                warn!("RBAC middleware called without authenticated user");
                return Err(ApiError::unauthorized("Authentication required").into());
            };

            match auth_user.role.parse::<Role>() {
                Ok(role) if required_roles.contains(&role) => {
                    debug!(
                        "RBAC check passed for {} with role {}",
                        auth_user.id, auth_user.role
                    );
                    service.call(req).await
                }
                Ok(_) => {
                    warn!(
                        "RBAC check failed for {} with role {}. Required roles: {:?}",
                        auth_user.id, auth_user.role, required_roles
                    );
                    Err(ApiError::forbidden("Insufficient permissions").into())
                }
                Err(_) => {
                    warn!("Invalid role in token: {}", auth_user.role);
                    Err(ApiError::forbidden("Invalid user role").into())
                }
            }
        })
    }
}
