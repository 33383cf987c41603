//! # REST API for Statements
//!
//! Multipart upload of a statement file, plus listing, detail and deletion of
//! the caller's statements.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, info, warn};

use super::authentication::AuthUser;
use super::error_response;
use super::mappers::statement_mapper::StatementMapper;
use crate::domain::commands::statements::UploadStatementCommand;
use crate::domain::StatementError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_statement))
        .route("/statements", get(list_statements))
        .route("/statements/:id", get(get_statement).delete(delete_statement))
}

struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    statement_name: Option<String>,
    bank_name: Option<String>,
    statement_period: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile { file_name, bytes });
            }
            "statement_name" => form.statement_name = Some(field.text().await?),
            "bank_name" => form.bank_name = Some(field.text().await?),
            "statement_period" => form.statement_period = Some(field.text().await?),
            other => warn!("Ignoring unexpected upload field '{}'", other),
        }
    }

    Ok(form)
}

/// Upload a statement file and process it synchronously
pub async fn upload_statement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    info!("POST /api/upload - user {}", user.id);

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Upload from user {} exceeded the size limit", user.id);
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "File exceeds the maximum upload size");
        }
        Err(e) => return error_response(e.status(), e.body_text()),
    };

    let Some(file) = form.file else {
        return error_response(StatusCode::BAD_REQUEST, "No file part in the request");
    };
    if file.file_name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file selected");
    }

    let command = UploadStatementCommand {
        file_name: file.file_name,
        bytes: file.bytes,
        statement_name: form.statement_name,
        bank_name: form.bank_name,
        statement_period: form.statement_period,
    };

    match state.statement_service.process_upload(user.id, command).await {
        Ok(result) => (StatusCode::OK, Json(StatementMapper::to_upload_response(result))).into_response(),
        Err(e @ StatementError::Extraction(_)) => {
            warn!("Rejected upload from user {}: {}", user.id, e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(StatementError::Parse(e)) => {
            error!("Language model failed for upload from user {}: {:#}", user.id, e);
            error_response(
                StatusCode::BAD_GATEWAY,
                "Failed to analyze the statement with the language model",
            )
        }
        Err(e) => {
            error!("Failed to process upload from user {}: {:#}", user.id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process statement")
        }
    }
}

/// All statements of the caller, newest first
pub async fn list_statements(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    info!("GET /api/statements - user {}", user.id);

    match state.statement_service.list_statements(user.id).await {
        Ok(statements) => (StatusCode::OK, Json(StatementMapper::to_list_response(statements))).into_response(),
        Err(e) => {
            error!("Failed to list statements: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving statements")
        }
    }
}

pub async fn get_statement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    statement_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(statement_id)) = statement_id else {
        return error_response(StatusCode::NOT_FOUND, "Statement not found");
    };
    info!("GET /api/statements/{} - user {}", statement_id, user.id);

    match state.statement_service.get_statement_details(user.id, statement_id).await {
        Ok(details) => (StatusCode::OK, Json(StatementMapper::to_detail_response(details))).into_response(),
        Err(e @ StatementError::NotFound) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            error!("Failed to load statement {}: {}", statement_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving statement")
        }
    }
}

pub async fn delete_statement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    statement_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(statement_id)) = statement_id else {
        return error_response(StatusCode::NOT_FOUND, "Statement not found");
    };
    info!("DELETE /api/statements/{} - user {}", statement_id, user.id);

    match state.statement_service.delete_statement(user.id, statement_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ StatementError::NotFound) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            error!("Failed to delete statement {}: {}", statement_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error deleting statement")
        }
    }
}
