//! # REST API for Transactions
//!
//! Filtered transaction lists and spending summaries across every statement
//! the caller owns.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tracing::{error, info};

use super::authentication::AuthUser;
use super::error_response;
use super::mappers::category_mapper::CategoryMapper;
use super::mappers::transaction_mapper::TransactionMapper;
use crate::domain::commands::transactions::{SpendingSummaryQuery, TransactionListQuery};
use crate::domain::TransactionQueryError;
use crate::AppState;
use shared::{SpendingSummaryRequest, SpendingSummaryResponse, TransactionListRequest, TransactionListResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/summary", get(get_spending_summary))
}

fn query_error_response(e: TransactionQueryError) -> Response {
    match e {
        TransactionQueryError::Internal(e) => {
            error!("Transaction query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving transactions")
        }
        invalid => error_response(StatusCode::BAD_REQUEST, invalid.to_string()),
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<TransactionListRequest>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    info!("GET /api/transactions - user {} query: {:?}", user.id, query);

    let query = TransactionListQuery {
        category: query.category,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    match state.transaction_service.list_transactions(user.id, query).await {
        Ok(transactions) => {
            let response = TransactionListResponse {
                transactions: TransactionMapper::to_dtos(transactions),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => query_error_response(e),
    }
}

pub async fn get_spending_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<SpendingSummaryRequest>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    info!("GET /api/summary - user {} query: {:?}", user.id, query);

    let query = SpendingSummaryQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    };

    match state.transaction_service.spending_summary(user.id, query).await {
        Ok(result) => {
            let response = SpendingSummaryResponse {
                summary: CategoryMapper::to_total_dtos(result.summary),
                total_spent: result.total_spent,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => query_error_response(e),
    }
}
