//! # REST API Interface Layer
//!
//! HTTP endpoints of the statement analyzer, all mounted under `/api`.
//! Handlers translate request DTOs from the `shared` crate into domain
//! commands, call the services on [`AppState`], and translate domain errors
//! into status codes with a `{"error": "..."}` body.
//!
//! Protected endpoints take an [`authentication::AuthUser`] argument, which
//! rejects requests without a valid bearer token before the handler runs.

pub mod auth_apis;
pub mod authentication;
pub mod category_apis;
pub mod health_apis;
pub mod mappers;
pub mod statement_apis;
pub mod transaction_apis;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use shared::ErrorResponse;

use crate::AppState;

/// Every API route, with request bodies capped at `max_body_bytes`
pub fn api_router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(auth_apis::router())
        .merge(statement_apis::router())
        .merge(transaction_apis::router())
        .merge(category_apis::router())
        .merge(health_apis::router())
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}
