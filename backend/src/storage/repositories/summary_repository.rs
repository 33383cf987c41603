use anyhow::Result;
use chrono::NaiveDate;
use sqlx::Row;

use crate::domain::models::category::CategoryTotal;
use crate::domain::models::transaction::format_date;
use crate::storage::connection::DbConnection;

/// Repository for per-statement spending summaries and cross-statement aggregates
#[derive(Clone)]
pub struct SummaryRepository {
    db: DbConnection,
}

impl SummaryRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_summary_entry(&self, statement_id: i64, category_id: i64, total_amount: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO spending_summaries (statement_id, category_id, total_amount)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(statement_id)
        .bind(category_id)
        .bind(total_amount)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Stored summary of one statement, largest total first
    pub async fn list_for_statement(&self, statement_id: i64) -> Result<Vec<CategoryTotal>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS category, s.total_amount
            FROM spending_summaries s
            JOIN categories c ON s.category_id = c.id
            WHERE s.statement_id = ?
            ORDER BY s.total_amount DESC, c.id ASC
            "#,
        )
        .bind(statement_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryTotal {
                category: row.get("category"),
                total_amount: row.get("total_amount"),
            })
            .collect())
    }

    /// Debit totals by category across every statement a user owns,
    /// optionally bounded by transaction date (inclusive)
    pub async fn aggregate_for_user(
        &self,
        user_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CategoryTotal>> {
        let start = start_date.map(format_date);
        let end = end_date.map(format_date);

        let rows = sqlx::query(
            r#"
            SELECT c.name AS category, SUM(t.amount) AS total_amount
            FROM transactions t
            JOIN statements s ON t.statement_id = s.id
            JOIN categories c ON t.category_id = c.id
            WHERE s.user_id = ?
              AND t.type = 'debit'
              AND (? IS NULL OR t.date >= ?)
              AND (? IS NULL OR t.date <= ?)
            GROUP BY c.id, c.name
            HAVING SUM(t.amount) > 0
            ORDER BY total_amount DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryTotal {
                category: row.get("category"),
                total_amount: row.get("total_amount"),
            })
            .collect())
    }
}
