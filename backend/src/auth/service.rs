//! Internal caller authentication
//!
//! Activity modules and the operations tooling call `/internal` routes with a
//! shared service token in the `X-Service-Token` header.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::FromRef, http::request::Parts};
use secrecy::ExposeSecret;

pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Marker for a request authenticated with the service token
#[derive(Debug, Clone, Copy)]
pub struct ServiceCaller;

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for ServiceCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let presented = parts
            .headers
            .get(SERVICE_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing service token".to_string()))?;

        if !tokens_match(presented, app_state.service_token().expose_secret()) {
            return Err(ApiError::Unauthorized("Invalid service token".to_string()));
        }

        Ok(ServiceCaller)
    }
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
