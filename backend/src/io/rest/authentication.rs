//! Bearer-token extractor for protected endpoints.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::Response,
};
use tracing::warn;

use super::error_response;
use crate::domain::models::user::AuthenticatedUser;
use crate::AppState;

/// The caller identified by the `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let Some(token) = token else {
            return Err(error_response(StatusCode::UNAUTHORIZED, "Authentication token is missing"));
        };

        match state.auth_service.verify_token(token) {
            Ok(user) => Ok(AuthUser(user)),
            Err(e) => {
                warn!("Rejected token on {}: {}", parts.uri.path(), e);
                Err(error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
            }
        }
    }
}
