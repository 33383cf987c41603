use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{format_timestamp, parse_timestamp};
use crate::domain::models::user::User;
use crate::storage::connection::DbConnection;

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    db: DbConnection,
}

impl UserRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a user and return its id. Fails on a duplicate email.
    pub async fn store_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(format_timestamp(created_at))
        .execute(self.db.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            created_at: parse_timestamp(row.get::<&str, _>("created_at"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_lookup_user() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db);

        let id = repo
            .store_user("ana@example.com", "hash", Some("Ana"), None, Utc::now())
            .await
            .unwrap();

        let by_email = repo.get_user_by_email("ana@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.first_name.as_deref(), Some("Ana"));
        assert!(by_email.last_name.is_none());

        let by_id = repo.get_user(id).await.unwrap().unwrap();
        assert_eq!(by_id, by_email);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db);

        repo.store_user("dup@example.com", "h1", None, None, Utc::now()).await.unwrap();
        let second = repo.store_user("dup@example.com", "h2", None, None, Utc::now()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db);

        assert!(repo.get_user(42).await.unwrap().is_none());
        assert!(repo.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
