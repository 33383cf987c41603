//! Account registration, password login and access-token handling.

use anyhow::Context;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::commands::auth::{LoginCommand, LoginResult, RegisterCommand};
use crate::domain::models::user::{AuthenticatedUser, User};
use crate::storage::{DbConnection, UserRepository};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

/// Claims carried in every access token
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    user_repository: UserRepository,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(db: DbConnection, settings: AuthSettings) -> Self {
        Self {
            user_repository: UserRepository::new(db),
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            token_ttl: settings.token_ttl,
            bcrypt_cost: settings.bcrypt_cost,
        }
    }

    /// Register a new account and return its id
    pub async fn register(&self, command: RegisterCommand) -> Result<i64, AuthError> {
        let email = User::normalize_email(&command.email);
        if email.is_empty() || command.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self.user_repository.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(command.password).await?;

        let stored = self
            .user_repository
            .store_user(
                &email,
                &password_hash,
                non_blank(command.first_name.as_deref()),
                non_blank(command.last_name.as_deref()),
                Utc::now(),
            )
            .await;

        match stored {
            Ok(user_id) => {
                info!("Registered user {} ({})", user_id, email);
                Ok(user_id)
            }
            // Lost a race with a concurrent registration for the same email
            Err(e) if is_unique_violation(&e) => Err(AuthError::EmailTaken),
            Err(e) => Err(AuthError::Internal(e)),
        }
    }

    /// Check a password and issue an access token
    pub async fn login(&self, command: LoginCommand) -> Result<LoginResult, AuthError> {
        let email = User::normalize_email(&command.email);
        if email.is_empty() || command.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let Some(user) = self.user_repository.get_user_by_email(&email).await? else {
            warn!("Login attempt for unknown email {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(command.password, user.password_hash.clone()).await? {
            warn!("Failed login for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        info!("User {} logged in", user.id);

        Ok(LoginResult {
            user_id: user.id,
            email: user.email,
            token,
        })
    }

    /// Sign an HS256 token for the user
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign access token")
            .map_err(AuthError::Internal)
    }

    /// Validate signature and expiry and return the token's identity
    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AuthError::InvalidToken)?;
        let id = data.claims.sub.parse::<i64>().map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            id,
            email: data.claims.email,
        })
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repository
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")?;
        Ok(hashed)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task failed")?;
        match verified {
            Ok(matches) => Ok(matches),
            // A corrupt stored hash is treated like a wrong password
            Err(e) => {
                warn!("Stored password hash could not be checked: {}", e);
                Ok(false)
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_unique_violation(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_error)) => db_error.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> AuthService {
        setup_with_ttl(Duration::hours(24)).await
    }

    async fn setup_with_ttl(token_ttl: Duration) -> AuthService {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        AuthService::new(
            db,
            AuthSettings {
                jwt_secret: "test-secret".to_string(),
                token_ttl,
                bcrypt_cost: 4,
            },
        )
    }

    fn register_command(email: &str, password: &str) -> RegisterCommand {
        RegisterCommand {
            email: email.to_string(),
            password: password.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("  ".to_string()),
        }
    }

    fn login_command(email: &str, password: &str) -> LoginCommand {
        LoginCommand {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = setup_test().await;

        let user_id = service.register(register_command("Ada@Example.com ", "hunter2")).await.unwrap();
        let login = service.login(login_command("ada@example.com", "hunter2")).await.unwrap();

        assert_eq!(login.user_id, user_id);
        assert_eq!(login.email, "ada@example.com");

        let identity = service.verify_token(&login.token).unwrap();
        assert_eq!(identity.id, user_id);
        assert_eq!(identity.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_register_stores_hash_and_trims_names() {
        let service = setup_test().await;

        let user_id = service.register(register_command("ada@example.com", "hunter2")).await.unwrap();
        let user = service.get_profile(user_id).await.unwrap();

        assert_ne!(user.password_hash, "hunter2");
        assert!(user.password_hash.starts_with("$2"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert!(user.last_name.is_none());
    }

    #[tokio::test]
    async fn test_register_requires_email_and_password() {
        let service = setup_test().await;

        assert!(matches!(
            service.register(register_command("", "pw")).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            service.register(register_command("a@b.c", "")).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let service = setup_test().await;

        service.register(register_command("ada@example.com", "pw")).await.unwrap();
        let result = service.register(register_command("ADA@example.com", "other")).await;

        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_login_failures_share_one_error() {
        let service = setup_test().await;
        service.register(register_command("ada@example.com", "right")).await.unwrap();

        let wrong_password = service.login(login_command("ada@example.com", "wrong")).await;
        let unknown_email = service.login(login_command("bob@example.com", "right")).await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_tampered_and_foreign_tokens_are_rejected() {
        let service = setup_test().await;
        service.register(register_command("ada@example.com", "pw")).await.unwrap();
        let token = service.login(login_command("ada@example.com", "pw")).await.unwrap().token;

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(service.verify_token(&tampered), Err(AuthError::InvalidToken)));
        assert!(matches!(service.verify_token("not-a-jwt"), Err(AuthError::InvalidToken)));

        let other = AuthService::new(
            DbConnection::init_test().await.unwrap(),
            AuthSettings {
                jwt_secret: "different-secret".to_string(),
                token_ttl: Duration::hours(1),
                bcrypt_cost: 4,
            },
        );
        assert!(matches!(other.verify_token(&token), Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let service = setup_with_ttl(Duration::hours(-2)).await;
        let user_id = service.register(register_command("ada@example.com", "pw")).await.unwrap();
        let user = service.get_profile(user_id).await.unwrap();

        let token = service.issue_token(&user).unwrap();
        assert!(matches!(service.verify_token(&token), Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_profile_of_missing_user() {
        let service = setup_test().await;
        assert!(matches!(service.get_profile(99).await, Err(AuthError::UserNotFound)));
    }
}
