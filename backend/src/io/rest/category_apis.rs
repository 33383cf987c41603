use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tracing::{error, info};

use super::authentication::AuthUser;
use super::error_response;
use super::mappers::category_mapper::CategoryMapper;
use crate::AppState;
use shared::CategoryListResponse;

pub fn router() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

/// The category taxonomy, in display order
pub async fn list_categories(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    info!("GET /api/categories - user {}", user.id);

    match state.category_service.list_categories().await {
        Ok(categories) => {
            let response = CategoryListResponse {
                categories: categories.into_iter().map(CategoryMapper::to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to list categories: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving categories")
        }
    }
}
