//! ABOUTME: Middleware modules for authentication and authorization
//! ABOUTME: Provides JWT authentication and RBAC middleware for Actix Web

pub mod auth;
pub mod rbac;
