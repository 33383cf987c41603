use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::transaction::{
    format_date, parse_date, parse_transaction_type, ParsedTransaction, Transaction,
};
use crate::storage::connection::DbConnection;

/// Optional filters for listing a user's transactions. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Repository for parsed transactions
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a transaction under a statement and return its id
    pub async fn store_transaction(
        &self,
        statement_id: i64,
        transaction: &ParsedTransaction,
        category_id: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (statement_id, date, description, amount, type, category_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(statement_id)
        .bind(format_date(transaction.date))
        .bind(&transaction.description)
        .bind(transaction.amount)
        .bind(transaction.transaction_type.to_string())
        .bind(category_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// List the transactions of one statement, most recent date first
    pub async fn list_for_statement(&self, statement_id: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.statement_id, t.date, t.description, t.amount, t.type,
                   c.name AS category
            FROM transactions t
            JOIN categories c ON t.category_id = c.id
            WHERE t.statement_id = ?
            ORDER BY t.date DESC, t.id ASC
            "#,
        )
        .bind(statement_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List transactions across all of a user's statements
    pub async fn list_for_user(&self, user_id: i64, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let start = filter.start_date.map(format_date);
        let end = filter.end_date.map(format_date);

        let rows = sqlx::query(
            r#"
            SELECT t.id, t.statement_id, t.date, t.description, t.amount, t.type,
                   c.name AS category
            FROM transactions t
            JOIN statements s ON t.statement_id = s.id
            JOIN categories c ON t.category_id = c.id
            WHERE s.user_id = ?
              AND (? IS NULL OR c.name = ?)
              AND (? IS NULL OR t.date >= ?)
              AND (? IS NULL OR t.date <= ?)
            ORDER BY t.date DESC, t.id ASC
            "#,
        )
        .bind(user_id)
        .bind(&filter.category)
        .bind(&filter.category)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let raw_date: &str = row.get("date");
        Ok(Transaction {
            id: row.get("id"),
            statement_id: row.get("statement_id"),
            date: parse_date(raw_date).with_context(|| format!("Invalid stored date: {}", raw_date))?,
            description: row.get("description"),
            amount: row.get("amount"),
            transaction_type: parse_transaction_type(row.get::<&str, _>("type"))?,
            category: row.get("category"),
        })
    }
}
