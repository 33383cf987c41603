//! # REST API for Accounts
//!
//! Registration, login and the caller's profile.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use super::authentication::AuthUser;
use super::error_response;
use super::mappers::user_mapper::UserMapper;
use crate::domain::commands::auth::{LoginCommand, RegisterCommand};
use crate::domain::AuthError;
use crate::AppState;
use shared::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile))
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    info!("POST /api/register - email: {:?}", request.email);

    let command = RegisterCommand {
        email: request.email.unwrap_or_default(),
        password: request.password.unwrap_or_default(),
        first_name: request.first_name,
        last_name: request.last_name,
    };

    match state.auth_service.register(command).await {
        Ok(user_id) => {
            let response = RegisterResponse {
                message: "User registered successfully".to_string(),
                user_id,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e @ (AuthError::MissingCredentials | AuthError::EmailTaken)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Failed to register user: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed")
        }
    }
}

/// Exchange email and password for an access token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    info!("POST /api/login - email: {:?}", request.email);

    let command = LoginCommand {
        email: request.email.unwrap_or_default(),
        password: request.password.unwrap_or_default(),
    };

    match state.auth_service.login(command).await {
        Ok(result) => {
            let response = LoginResponse {
                user_id: result.user_id,
                email: result.email,
                token: result.token,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e @ AuthError::MissingCredentials) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e @ AuthError::InvalidCredentials) => error_response(StatusCode::UNAUTHORIZED, e.to_string()),
        Err(e) => {
            error!("Failed to log in: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
        }
    }
}

/// Profile of the authenticated user
pub async fn get_profile(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    info!("GET /api/profile - user {}", user.id);

    match state.auth_service.get_profile(user.id).await {
        Ok(profile) => (StatusCode::OK, Json(UserMapper::to_profile_response(profile))).into_response(),
        Err(e @ AuthError::UserNotFound) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            error!("Failed to load profile for user {}: {}", user.id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving profile")
        }
    }
}
