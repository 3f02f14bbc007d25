//! ABOUTME: JWT issuing and verification for moderator access
//! ABOUTME: Tokens carry a subject and a role and are signed with the configured secret

use crate::models::{Claims, Role};
use fg_core::{Error, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

/// JWT token utilities
pub struct JwtAuth;

impl JwtAuth {
    /// Default token lifetime in seconds (24 hours)
    pub const TOKEN_EXPIRATION_SECS: u64 = 24 * 60 * 60;

    /// Create a token valid for the default lifetime
    pub fn create_token(subject: &str, role: Role, secret: &str) -> Result<String> {
        Self::create_token_with_ttl(subject, role, secret, Self::TOKEN_EXPIRATION_SECS)
    }

    #[instrument(skip(secret))]
    pub fn create_token_with_ttl(
        subject: &str,
        role: Role,
        secret: &str,
        ttl_secs: u64,
    ) -> Result<String> {
        debug!("Creating JWT token for subject: {}", subject);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Config(format!("Time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: subject.to_string(),
            role: role.as_str().to_string(),
            exp: now.saturating_add(usize::try_from(ttl_secs).unwrap_or(usize::MAX)),
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(|e| Error::Config(format!("Failed to create JWT: {}", e)))
    }

    /// Verify and decode a JWT token
    #[instrument(skip(token, secret))]
    pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| Error::Validation(format!("Invalid JWT: {}", e)))?;

        debug!("JWT token verified for subject: {}", token_data.claims.sub);
        Ok(token_data.claims)
    }
}
