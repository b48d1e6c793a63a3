//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use liveclass_common::AppError;

use crate::middleware::CallerId;

/// Authenticated caller extractor.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by caller_middleware
        parts
            .extensions
            .get::<CallerId>()
            .map(|caller| Self(caller.0.clone()))
            .ok_or(AppError::Unauthorized)
    }
}
