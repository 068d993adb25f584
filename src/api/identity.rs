//! Caller Identity
//!
//! Session authentication happens upstream (the dashboard's auth layer or a
//! gateway); by the time a request reaches this service the authenticated
//! user ID is carried in the `X-User-Id` header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::fmt;

use super::error::ApiError;

/// Header carrying the authenticated user ID
pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// Authenticated user ID extracted from the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw identity value
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ApiError::Unauthorized("Empty user identity".to_string()));
        }
        if id.len() > MAX_USER_ID_LEN {
            return Err(ApiError::Unauthorized(format!(
                "User identity exceeds {} characters",
                MAX_USER_ID_LEN
            )));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing user identity".to_string()))?;

        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Malformed user identity".to_string()))?;

        Self::parse(raw)
    }
}
