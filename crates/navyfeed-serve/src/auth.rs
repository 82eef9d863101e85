//! Optional caller authentication.
//!
//! Feed skeleton requests may carry credentials, but don't have to: a
//! request with no `Authorization` header is served as anonymous. Only a
//! header that is present but unusable is an error.
//!
//! Verifying the credential and resolving it to an identity is an external
//! concern (service-JWT validation against a DID resolver in production),
//! so it sits behind the [`Authenticator`] trait. The default
//! [`BearerIdentity`] implementation extracts the bearer token as the
//! caller's identity string without further resolution.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::error::ApiError;

/// Resolves optional request credentials to a caller identity.
pub trait Authenticator: Send + Sync {
    /// Returns `Ok(None)` for requests without credentials, `Ok(Some(id))`
    /// for accepted credentials, and an error for credentials that are
    /// present but invalid.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError>;
}

/// Bearer-token authenticator: the token itself names the caller.
#[derive(Debug, Default)]
pub struct BearerIdentity;

impl Authenticator for BearerIdentity {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };

        let header = value.to_str().map_err(|_| {
            ApiError::AuthRequired("authorization header is not valid UTF-8".to_string())
        })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::AuthRequired("expected a Bearer authorization header".to_string())
        })?;

        if token.trim().is_empty() {
            return Err(ApiError::AuthRequired("empty bearer token".to_string()));
        }

        Ok(Some(token.trim().to_string()))
    }
}
