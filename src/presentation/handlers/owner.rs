use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::OwnerId;

use super::ApiError;

pub const OWNER_HEADER: &str = "x-owner-id";

/// Caller identity as established by the upstream authenticator.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(OwnerId::new(v)))
            .ok_or_else(|| ApiError::unauthorized("Missing caller identity"))
    }
}
