//! Transaction listing and spending summaries across a user's statements.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::domain::commands::transactions::{SpendingSummaryQuery, SpendingSummaryResult, TransactionListQuery};
use crate::domain::models::transaction::{parse_date, Transaction};
use crate::storage::{DbConnection, SummaryRepository, TransactionFilter, TransactionRepository};

#[derive(Debug, Error)]
pub enum TransactionQueryError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("start_date must not be after end_date")]
    InvertedRange,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TransactionService {
    transaction_repository: TransactionRepository,
    summary_repository: SummaryRepository,
}

impl TransactionService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            transaction_repository: TransactionRepository::new(db.clone()),
            summary_repository: SummaryRepository::new(db),
        }
    }

    /// Every transaction the user owns, newest first. An unknown category simply
    /// matches nothing.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        query: TransactionListQuery,
    ) -> Result<Vec<Transaction>, TransactionQueryError> {
        let (start_date, end_date) = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;
        let filter = TransactionFilter {
            category: query.category.filter(|c| !c.trim().is_empty()),
            start_date,
            end_date,
        };

        let transactions = self.transaction_repository.list_for_user(user_id, &filter).await?;
        info!("Found {} transactions for user {}", transactions.len(), user_id);
        Ok(transactions)
    }

    /// Debit totals per category plus their sum
    pub async fn spending_summary(
        &self,
        user_id: i64,
        query: SpendingSummaryQuery,
    ) -> Result<SpendingSummaryResult, TransactionQueryError> {
        let (start_date, end_date) = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;

        let summary = self
            .summary_repository
            .aggregate_for_user(user_id, start_date, end_date)
            .await?;
        let total_spent = summary.iter().map(|entry| entry.total_amount).sum();

        Ok(SpendingSummaryResult { summary, total_spent })
    }
}

/// Blank values count as absent
fn parse_bound(raw: Option<&str>) -> Result<Option<NaiveDate>, TransactionQueryError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| TransactionQueryError::InvalidDate(value.to_string())),
    }
}

fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), TransactionQueryError> {
    let start = parse_bound(start)?;
    let end = parse_bound(end)?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(TransactionQueryError::InvertedRange);
        }
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::statement::NewStatement;
    use crate::domain::models::transaction::ParsedTransaction;
    use crate::storage::{CategoryRepository, StatementRepository, UserRepository};
    use chrono::Utc;
    use shared::TransactionType;

    struct TestContext {
        db: DbConnection,
        service: TransactionService,
        user_id: i64,
    }

    async fn setup_test() -> TestContext {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let user_id = UserRepository::new(db.clone())
            .store_user("ada@example.com", "hash", None, None, Utc::now())
            .await
            .expect("Failed to create user");
        TestContext {
            service: TransactionService::new(db.clone()),
            db,
            user_id,
        }
    }

    async fn store_statement(ctx: &TestContext, user_id: i64, rows: &[(&str, &str, f64, TransactionType, &str)]) {
        let statement_id = StatementRepository::new(ctx.db.clone())
            .store_statement(&NewStatement {
                user_id,
                statement_name: "Test".to_string(),
                bank_name: None,
                statement_period: None,
                file_name: "test.csv".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let categories = CategoryRepository::new(ctx.db.clone());
        let transactions = TransactionRepository::new(ctx.db.clone());
        for (date, description, amount, transaction_type, category) in rows {
            let category_id = categories.get_category_by_name(category).await.unwrap().unwrap().id;
            let parsed = ParsedTransaction {
                date: parse_date(date).unwrap(),
                description: description.to_string(),
                amount: *amount,
                transaction_type: *transaction_type,
                category: category.to_string(),
            };
            transactions
                .store_transaction(statement_id, &parsed, category_id)
                .await
                .unwrap();
        }
    }

    async fn seed(ctx: &TestContext) {
        store_statement(
            ctx,
            ctx.user_id,
            &[
                ("2024-01-05", "Grocery Mart", 40.0, TransactionType::Debit, "Food & Dining"),
                ("2024-01-20", "Bus pass", 25.0, TransactionType::Debit, "Travel & Transportation"),
                ("2024-02-03", "Cafe", 10.0, TransactionType::Debit, "Food & Dining"),
                ("2024-02-04", "Salary", 3000.0, TransactionType::Credit, "Miscellaneous"),
            ],
        )
        .await;
    }

    fn list_query(category: Option<&str>, start: Option<&str>, end: Option<&str>) -> TransactionListQuery {
        TransactionListQuery {
            category: category.map(str::to_string),
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_list_transactions_filters() {
        let ctx = setup_test().await;
        seed(&ctx).await;

        let all = ctx.service.list_transactions(ctx.user_id, list_query(None, None, None)).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].description, "Salary");

        let food = ctx
            .service
            .list_transactions(ctx.user_id, list_query(Some("Food & Dining"), None, None))
            .await
            .unwrap();
        assert_eq!(food.len(), 2);
        assert!(food.iter().all(|t| t.category == "Food & Dining"));

        let january = ctx
            .service
            .list_transactions(ctx.user_id, list_query(Some(""), Some("2024-01-01"), Some("2024-01-31")))
            .await
            .unwrap();
        assert_eq!(january.len(), 2);

        let unknown = ctx
            .service
            .list_transactions(ctx.user_id, list_query(Some("Gambling"), None, None))
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_filters_are_rejected() {
        let ctx = setup_test().await;

        assert!(matches!(
            ctx.service
                .list_transactions(ctx.user_id, list_query(None, Some("01/02/2024"), None))
                .await,
            Err(TransactionQueryError::InvalidDate(_))
        ));
        assert!(matches!(
            ctx.service
                .list_transactions(ctx.user_id, list_query(None, Some("2024-02-01"), Some("2024-01-01")))
                .await,
            Err(TransactionQueryError::InvertedRange)
        ));
        assert!(matches!(
            ctx.service
                .spending_summary(
                    ctx.user_id,
                    SpendingSummaryQuery {
                        start_date: None,
                        end_date: Some("2024-13-01".to_string()),
                    }
                )
                .await,
            Err(TransactionQueryError::InvalidDate(_))
        ));
    }

    #[tokio::test]
    async fn test_spending_summary_counts_debits_only() {
        let ctx = setup_test().await;
        seed(&ctx).await;

        let result = ctx
            .service
            .spending_summary(ctx.user_id, SpendingSummaryQuery::default())
            .await
            .unwrap();

        assert_eq!(result.summary.len(), 2);
        assert_eq!(result.summary[0].category, "Food & Dining");
        assert_eq!(result.summary[0].total_amount, 50.0);
        assert_eq!(result.total_spent, 75.0);

        let february = ctx
            .service
            .spending_summary(
                ctx.user_id,
                SpendingSummaryQuery {
                    start_date: Some("2024-02-01".to_string()),
                    end_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(february.summary.len(), 1);
        assert_eq!(february.total_spent, 10.0);
    }

    #[tokio::test]
    async fn test_other_users_transactions_are_invisible() {
        let ctx = setup_test().await;
        seed(&ctx).await;
        let other = UserRepository::new(ctx.db.clone())
            .store_user("bob@example.com", "hash", None, None, Utc::now())
            .await
            .unwrap();
        store_statement(&ctx, other, &[("2024-01-10", "Taxi", 12.0, TransactionType::Debit, "Travel & Transportation")])
            .await;

        let mine = ctx.service.list_transactions(ctx.user_id, list_query(None, None, None)).await.unwrap();
        assert_eq!(mine.len(), 4);

        let theirs = ctx.service.spending_summary(other, SpendingSummaryQuery::default()).await.unwrap();
        assert_eq!(theirs.total_spent, 12.0);
    }

    #[tokio::test]
    async fn test_empty_account() {
        let ctx = setup_test().await;
        let result = ctx
            .service
            .spending_summary(ctx.user_id, SpendingSummaryQuery::default())
            .await
            .unwrap();
        assert!(result.summary.is_empty());
        assert_eq!(result.total_spent, 0.0);
    }
}
