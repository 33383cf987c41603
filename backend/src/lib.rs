//! # Statement Analyzer Backend
//!
//! HTTP backend that turns uploaded bank statements into categorized
//! transactions and spending summaries.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, Gemini client)
//!     ↓
//! Domain Layer (services, statement parser, document text)
//!     ↓
//! Storage Layer (SQLite repositories)
//! ```
//!
//! [`initialize_backend`] wires the layers together from a [`Config`] and
//! [`create_router`] builds the axum application around the resulting state.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Config;

use crate::domain::language_model::TextGenerator;
use crate::domain::{
    AuthService, AuthSettings, CategoryService, ParserSettings, StatementParser, StatementService,
    TransactionService,
};
use crate::io::llm::GeminiClient;
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub statement_service: StatementService,
    pub transaction_service: TransactionService,
    pub category_service: CategoryService,
}

impl AppState {
    pub fn new(
        db: DbConnection,
        model: Arc<dyn TextGenerator>,
        auth_settings: AuthSettings,
        parser_settings: ParserSettings,
        upload_dir: PathBuf,
    ) -> Self {
        let parser = StatementParser::new(model, parser_settings);

        Self {
            auth_service: AuthService::new(db.clone(), auth_settings),
            statement_service: StatementService::new(db.clone(), parser, upload_dir),
            transaction_service: TransactionService::new(db.clone()),
            category_service: CategoryService::new(db),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &Config) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up language model client for {}", config.gemini_model);
    let model = GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        config.google_api_key.clone(),
        config.llm_timeout(),
    )?;

    info!("Setting up application state");
    Ok(AppState::new(
        db,
        Arc::new(model),
        AuthSettings {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl(),
            bcrypt_cost: config.bcrypt_cost,
        },
        ParserSettings {
            text_limit: config.prompt_text_limit,
            batch_size: config.categorize_batch_size,
        },
        config.upload_dir.clone(),
    ))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &Config) -> Result<Router> {
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", config.cors_origin))?;

    // CORS setup to allow the frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let mut router = Router::new().nest("/api", io::rest::api_router(config.max_upload_bytes()));

    if let Some(static_dir) = &config.static_dir {
        info!("Serving static files from {}", static_dir.display());
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::language_model::testing::ScriptedGenerator;
    use axum::{body::Body, http::Request, http::StatusCode};
    use clap::Parser;
    use tower::util::ServiceExt;

    fn test_config(extra: &[&str]) -> Config {
        let mut args = vec![
            "statement-analyzer",
            "--jwt-secret",
            "test-secret",
            "--google-api-key",
            "key",
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    async fn test_state() -> AppState {
        AppState::new(
            DbConnection::init_test().await.unwrap(),
            Arc::new(ScriptedGenerator::default()),
            AuthSettings {
                jwt_secret: "test-secret".to_string(),
                token_ttl: chrono::Duration::hours(1),
                bcrypt_cost: 4,
            },
            ParserSettings::default(),
            std::env::temp_dir(),
        )
    }

    #[tokio::test]
    async fn test_api_is_nested_under_prefix() {
        let app = create_router(test_state().await, &test_config(&[])).unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let config = test_config(&["--cors-origin", "http://app.example"]);
        let app = create_router(test_state().await, &config).unwrap();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/statements")
            .header("origin", "http://app.example")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://app.example"
        );
    }

    #[tokio::test]
    async fn test_static_dir_is_the_fallback() {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), "<h1>analyzer</h1>").unwrap();
        let dir = static_dir.path().to_str().unwrap().to_string();
        let app = create_router(test_state().await, &test_config(&["--static-dir", &dir])).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>analyzer</h1>");
    }

    #[tokio::test]
    async fn test_invalid_cors_origin_is_an_error() {
        let config = test_config(&["--cors-origin", "bad\norigin"]);
        assert!(create_router(test_state().await, &config).is_err());
    }
}
