use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::utils::error::AppError;

/// Claims carried by an admin bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
}

/// Who a bearer token belongs to, once verified.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub email: String,
}

/// Verifies bearer tokens into identities. The production implementation
/// checks a signed JWT; tests substitute their own.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AppError>;
}

/// HS256 JWT verification against a shared secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let data = jsonwebtoken::decode::<AdminClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| {
            tracing::warn!("Rejected admin token: {}", err);
            AppError::AuthError("Invalid or expired token.".to_string())
        })?;
        Ok(Identity {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Allow-list of admin emails. Matching is case-insensitive.
pub struct AdminPolicy {
    allowed: Vec<String>,
}

impl AdminPolicy {
    pub fn from_emails(emails: &[String]) -> Self {
        Self {
            allowed: emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.allowed.iter().any(|e| e == &email.to_lowercase())
    }
}

/// Checks the Authorization header end to end: presence, token validity and
/// admin membership.
pub async fn authorize(
    header: Option<&str>,
    verifier: &dyn IdentityVerifier,
    policy: &AdminPolicy,
) -> Result<Identity, AppError> {
    let header = header.ok_or_else(|| {
        AppError::AuthError("No authorization token provided.".to_string())
    })?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    let identity = verifier.verify(token).await?;
    if !policy.is_admin(&identity.email) {
        return Err(AppError::Forbidden(
            "Access denied. Not an authorized administrator.".to_string(),
        ));
    }
    Ok(identity)
}

/// Extractor guarding admin routes. Handlers that take this argument only run
/// for verified allow-listed admins.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let identity = authorize(header, state.verifier.as_ref(), &state.admin_policy).await?;
        Ok(Self { identity })
    }
}
