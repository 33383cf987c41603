use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::ProcessingStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{format_timestamp, parse_timestamp};
use crate::domain::models::statement::{parse_status, NewStatement, Statement};
use crate::storage::connection::DbConnection;

const STATEMENT_COLUMNS: &str = "id, user_id, statement_name, bank_name, statement_period, \
     file_name, processing_status, processed_at, created_at";

/// Repository for uploaded statements
#[derive(Clone)]
pub struct StatementRepository {
    db: DbConnection,
}

impl StatementRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a statement in the `pending` state and return its id
    pub async fn store_statement(&self, statement: &NewStatement) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO statements
                (user_id, statement_name, bank_name, statement_period, file_name,
                 processing_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(statement.user_id)
        .bind(&statement.statement_name)
        .bind(&statement.bank_name)
        .bind(&statement.statement_period)
        .bind(&statement.file_name)
        .bind(ProcessingStatus::Pending.to_string())
        .bind(format_timestamp(statement.created_at))
        .execute(self.db.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// List a user's statements, newest first
    pub async fn list_statements(&self, user_id: i64) -> Result<Vec<Statement>> {
        let query = format!(
            "SELECT {} FROM statements WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            STATEMENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(Self::row_to_statement).collect()
    }

    /// Get a statement only if it belongs to the given user
    pub async fn get_statement(&self, user_id: i64, statement_id: i64) -> Result<Option<Statement>> {
        let query = format!(
            "SELECT {} FROM statements WHERE id = ? AND user_id = ?",
            STATEMENT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(statement_id)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_statement).transpose()
    }

    pub async fn mark_completed(&self, statement_id: i64, processed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE statements
            SET processing_status = ?, processed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ProcessingStatus::Completed.to_string())
        .bind(format_timestamp(processed_at))
        .bind(statement_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, statement_id: i64) -> Result<()> {
        sqlx::query("UPDATE statements SET processing_status = ? WHERE id = ?")
            .bind(ProcessingStatus::Failed.to_string())
            .bind(statement_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Delete a statement and, through cascades, its transactions and summary.
    /// Returns false when no statement with that id belongs to the user.
    pub async fn delete_statement(&self, user_id: i64, statement_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM statements WHERE id = ? AND user_id = ?")
            .bind(statement_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_statement(row: &SqliteRow) -> Result<Statement> {
        let processed_at = row
            .get::<Option<&str>, _>("processed_at")
            .map(parse_timestamp)
            .transpose()?;

        Ok(Statement {
            id: row.get("id"),
            user_id: row.get("user_id"),
            statement_name: row.get("statement_name"),
            bank_name: row.get("bank_name"),
            statement_period: row.get("statement_period"),
            file_name: row.get("file_name"),
            processing_status: parse_status(row.get::<&str, _>("processing_status"))?,
            processed_at,
            created_at: parse_timestamp(row.get::<&str, _>("created_at"))?,
        })
    }
}
