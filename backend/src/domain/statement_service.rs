//! Statement upload pipeline and statement lookups.
//!
//! An upload goes through these stages, in order:
//!
//! 1. the client file name is sanitized and its extension picks a [`DocumentFormat`];
//!    nothing is stored for unsupported files
//! 2. the bytes are written under the upload directory, read back and converted to
//!    text on a blocking thread; the file is removed whether or not that worked
//! 3. a `pending` statement row is created
//! 4. the [`StatementParser`] extracts and categorizes transactions
//! 5. transactions and non-zero category totals are stored and the statement is
//!    marked `completed`
//!
//! A failure after step 3 marks the statement `failed`; whatever was stored
//! before the failure stays.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::commands::statements::{StatementDetails, UploadStatementCommand, UploadStatementResult};
use crate::domain::document_text::{extract_text, DocumentFormat, ExtractionError};
use crate::domain::models::category::CategoryTotal;
use crate::domain::models::statement::{NewStatement, Statement};
use crate::domain::models::transaction::ParsedTransaction;
use crate::domain::statement_parser::{summarize, ParseError, StatementParser};
use crate::storage::{
    CategoryRepository, DbConnection, StatementRepository, SummaryRepository, TransactionRepository,
    FALLBACK_CATEGORY,
};

/// Disambiguates uploads that land in the same millisecond
static UPLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum StatementError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Statement not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct StatementService {
    statement_repository: StatementRepository,
    transaction_repository: TransactionRepository,
    summary_repository: SummaryRepository,
    category_repository: CategoryRepository,
    parser: StatementParser,
    upload_dir: PathBuf,
}

impl StatementService {
    pub fn new(db: DbConnection, parser: StatementParser, upload_dir: PathBuf) -> Self {
        Self {
            statement_repository: StatementRepository::new(db.clone()),
            transaction_repository: TransactionRepository::new(db.clone()),
            summary_repository: SummaryRepository::new(db.clone()),
            category_repository: CategoryRepository::new(db),
            parser,
            upload_dir,
        }
    }

    pub async fn process_upload(
        &self,
        user_id: i64,
        command: UploadStatementCommand,
    ) -> Result<UploadStatementResult, StatementError> {
        let file_name = sanitize_file_name(&command.file_name);
        let format = DocumentFormat::from_file_name(&file_name)?;
        info!(
            "Processing {} upload '{}' ({} bytes) for user {}",
            format,
            file_name,
            command.bytes.len(),
            user_id
        );

        let text = self.extract_via_upload_dir(&file_name, format, command.bytes).await?;

        let statement_name = non_blank(command.statement_name).unwrap_or_else(|| file_name.clone());
        let statement_id = self
            .statement_repository
            .store_statement(&NewStatement {
                user_id,
                statement_name,
                bank_name: non_blank(command.bank_name),
                statement_period: non_blank(command.statement_period),
                file_name,
                created_at: Utc::now(),
            })
            .await?;

        match self.populate_statement(statement_id, &text).await {
            Ok((transactions, summary)) => {
                info!(
                    "Statement {} completed with {} transactions",
                    statement_id,
                    transactions.len()
                );
                Ok(UploadStatementResult {
                    statement_id,
                    transactions,
                    summary,
                })
            }
            Err(e) => {
                error!("Processing statement {} failed: {}", statement_id, e);
                if let Err(mark_error) = self.statement_repository.mark_failed(statement_id).await {
                    error!("Could not mark statement {} as failed: {}", statement_id, mark_error);
                }
                Err(e)
            }
        }
    }

    pub async fn list_statements(&self, user_id: i64) -> Result<Vec<Statement>, StatementError> {
        Ok(self.statement_repository.list_statements(user_id).await?)
    }

    pub async fn get_statement_details(
        &self,
        user_id: i64,
        statement_id: i64,
    ) -> Result<StatementDetails, StatementError> {
        let statement = self
            .statement_repository
            .get_statement(user_id, statement_id)
            .await?
            .ok_or(StatementError::NotFound)?;

        let transactions = self.transaction_repository.list_for_statement(statement_id).await?;
        let summary = self.summary_repository.list_for_statement(statement_id).await?;

        Ok(StatementDetails {
            statement,
            transactions,
            summary,
        })
    }

    /// Delete a statement with its transactions and summary entries
    pub async fn delete_statement(&self, user_id: i64, statement_id: i64) -> Result<(), StatementError> {
        if !self.statement_repository.delete_statement(user_id, statement_id).await? {
            return Err(StatementError::NotFound);
        }
        info!("Deleted statement {} for user {}", statement_id, user_id);
        Ok(())
    }

    async fn extract_via_upload_dir(
        &self,
        file_name: &str,
        format: DocumentFormat,
        bytes: Vec<u8>,
    ) -> Result<String, StatementError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", self.upload_dir.display()))?;

        let path = self.upload_path(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write upload to {}", path.display()))?;

        let read_path = path.clone();
        let extracted = tokio::task::spawn_blocking(move || read_and_extract(&read_path, format)).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Could not remove upload {}: {}", path.display(), e);
        }

        match extracted {
            Ok(result) => result,
            Err(join_error) => Err(StatementError::Internal(anyhow!(
                "Text extraction task failed: {}",
                join_error
            ))),
        }
    }

    fn upload_path(&self, file_name: &str) -> PathBuf {
        let sequence = UPLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.upload_dir
            .join(format!("{}_{}_{}", Utc::now().timestamp_millis(), sequence, file_name))
    }

    async fn populate_statement(
        &self,
        statement_id: i64,
        text: &str,
    ) -> Result<(Vec<ParsedTransaction>, Vec<CategoryTotal>), StatementError> {
        let category_ids: HashMap<String, i64> = self
            .category_repository
            .list_categories()
            .await?
            .into_iter()
            .map(|category| (category.name, category.id))
            .collect();
        let category_names = taxonomy(&category_ids);
        let fallback_id = *category_ids
            .get(FALLBACK_CATEGORY)
            .ok_or_else(|| anyhow!("Category '{}' is missing", FALLBACK_CATEGORY))?;

        let transactions = self
            .parser
            .parse(text, &category_names, Utc::now().date_naive())
            .await?;

        let transactions = self
            .store_transactions(statement_id, transactions, &category_ids, fallback_id)
            .await;

        let summary = summarize(&transactions, &category_names);
        for entry in summary.iter().filter(|entry| entry.total_amount > 0.0) {
            let category_id = category_ids.get(&entry.category).copied().unwrap_or(fallback_id);
            self.summary_repository
                .store_summary_entry(statement_id, category_id, entry.total_amount)
                .await?;
        }

        self.statement_repository.mark_completed(statement_id, Utc::now()).await?;

        Ok((transactions, summary))
    }

    /// Store each transaction and return the ones that made it into the database.
    /// Rows that fail to insert are logged and left out of the summary.
    async fn store_transactions(
        &self,
        statement_id: i64,
        transactions: Vec<ParsedTransaction>,
        category_ids: &HashMap<String, i64>,
        fallback_id: i64,
    ) -> Vec<ParsedTransaction> {
        let mut stored = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let category_id = category_ids.get(&transaction.category).copied().unwrap_or(fallback_id);
            match self
                .transaction_repository
                .store_transaction(statement_id, &transaction, category_id)
                .await
            {
                Ok(_) => stored.push(transaction),
                Err(e) => warn!(
                    "Skipping transaction '{}' on statement {}: {}",
                    transaction.description, statement_id, e
                ),
            }
        }
        stored
    }
}

/// Category names ordered by id with the fallback category last
fn taxonomy(category_ids: &HashMap<String, i64>) -> Vec<String> {
    let mut named: Vec<(&String, &i64)> = category_ids
        .iter()
        .filter(|(name, _)| name.as_str() != FALLBACK_CATEGORY)
        .collect();
    named.sort_by_key(|(_, id)| **id);

    let mut names: Vec<String> = named.into_iter().map(|(name, _)| name.clone()).collect();
    names.push(FALLBACK_CATEGORY.to_string());
    names
}

fn read_and_extract(path: &Path, format: DocumentFormat) -> Result<String, StatementError> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read upload {}", path.display()))?;
    Ok(extract_text(format, &bytes)?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reduce a client file name to a safe base name. Directory parts are dropped and
/// every character outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::language_model::testing::ScriptedGenerator;
    use crate::domain::language_model::TextGenerator;
    use crate::domain::statement_parser::ParserSettings;
    use crate::storage::UserRepository;
    use shared::{ProcessingStatus, TransactionType};
    use std::sync::Arc;

    const CSV_STATEMENT: &[u8] =
        b"Date,Description,Amount\n2024-03-01,Grocery Mart,-45.10\n2024-03-02,Salary,2500.00\n2024-03-03,Netflix,-15.99\n";

    const EXTRACTED: &str = r#"Here you go:
[
  {"date": "2024-03-01", "description": "Grocery Mart", "amount": 45.10, "type": "debit"},
  {"date": "2024-03-02", "description": "Salary", "amount": 2500.00, "type": "credit"},
  {"date": "2024-03-03", "description": "Netflix", "amount": 15.99, "type": "debit"}
]"#;

    const CATEGORIZED: &str = r#"[
  {"date": "2024-03-01", "description": "Grocery Mart", "amount": 45.10, "type": "debit", "category": "Food & Dining"},
  {"date": "2024-03-02", "description": "Salary", "amount": 2500.00, "type": "credit", "category": "Miscellaneous"},
  {"date": "2024-03-03", "description": "Netflix", "amount": 15.99, "type": "debit", "category": "Subscriptions"}
]"#;

    struct TestContext {
        db: DbConnection,
        service: StatementService,
        user_id: i64,
        upload_dir: tempfile::TempDir,
    }

    async fn setup_test(model: impl TextGenerator + 'static) -> TestContext {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let user_id = UserRepository::new(db.clone())
            .store_user("ada@example.com", "hash", None, None, Utc::now())
            .await
            .expect("Failed to create user");
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
        let parser = StatementParser::new(Arc::new(model), ParserSettings::default());
        let service = StatementService::new(db.clone(), parser, upload_dir.path().join("uploads"));

        TestContext {
            db,
            service,
            user_id,
            upload_dir,
        }
    }

    fn upload(file_name: &str, bytes: &[u8]) -> UploadStatementCommand {
        UploadStatementCommand {
            file_name: file_name.to_string(),
            bytes: bytes.to_vec(),
            statement_name: Some("March".to_string()),
            bank_name: Some("First Bank".to_string()),
            statement_period: Some(" ".to_string()),
        }
    }

    fn leftover_uploads(ctx: &TestContext) -> usize {
        std::fs::read_dir(ctx.upload_dir.path().join("uploads"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("march statement.pdf"), "march_statement.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\ada\\bank.xlsx"), "bank.xlsx");
        assert_eq!(sanitize_file_name(".hidden.csv"), "hidden.csv");
        assert_eq!(sanitize_file_name("relevé.csv"), "relev_.csv");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("///"), "upload");
    }

    #[test]
    fn test_taxonomy_puts_fallback_last() {
        let ids: HashMap<String, i64> = [("Miscellaneous", 1), ("Travel", 3), ("Food", 2)]
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        assert_eq!(taxonomy(&ids), vec!["Food", "Travel", "Miscellaneous"]);
    }

    #[tokio::test]
    async fn test_process_upload_stores_everything() {
        let ctx = setup_test(ScriptedGenerator::new([EXTRACTED, CATEGORIZED])).await;

        let result = ctx
            .service
            .process_upload(ctx.user_id, upload("march.csv", CSV_STATEMENT))
            .await
            .unwrap();

        assert_eq!(result.transactions.len(), 3);
        assert_eq!(result.summary.len(), 8);
        let food = result.summary.iter().find(|e| e.category == "Food & Dining").unwrap();
        assert!((food.total_amount - 45.10).abs() < 1e-9);
        let misc = result.summary.iter().find(|e| e.category == "Miscellaneous").unwrap();
        assert_eq!(misc.total_amount, 0.0);

        let details = ctx
            .service
            .get_statement_details(ctx.user_id, result.statement_id)
            .await
            .unwrap();
        assert_eq!(details.statement.processing_status, ProcessingStatus::Completed);
        assert!(details.statement.processed_at.is_some());
        assert_eq!(details.statement.statement_name, "March");
        assert_eq!(details.statement.bank_name.as_deref(), Some("First Bank"));
        assert!(details.statement.statement_period.is_none());
        assert_eq!(details.statement.file_name, "march.csv");
        assert_eq!(details.transactions.len(), 3);
        assert_eq!(details.transactions[0].description, "Netflix");

        let salary = details.transactions.iter().find(|t| t.description == "Salary").unwrap();
        assert_eq!(salary.transaction_type, TransactionType::Credit);

        // Only non-zero debit totals are stored
        let stored: Vec<&str> = details.summary.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(stored, vec!["Food & Dining", "Subscriptions"]);

        assert_eq!(leftover_uploads(&ctx), 0);
    }

    #[tokio::test]
    async fn test_rows_that_fail_to_store_are_left_out() {
        let ctx = setup_test(ScriptedGenerator::default()).await;
        let statement_id = StatementRepository::new(ctx.db.clone())
            .store_statement(&NewStatement {
                user_id: ctx.user_id,
                statement_name: "March".to_string(),
                bank_name: None,
                statement_period: None,
                file_name: "march.csv".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let food_id = CategoryRepository::new(ctx.db.clone())
            .get_category_by_name("Food & Dining")
            .await
            .unwrap()
            .unwrap()
            .id;
        // No category has this id, so the foreign key rejects the insert
        let category_ids: HashMap<String, i64> = [("Food & Dining".to_string(), food_id), ("Shopping".to_string(), 9999)]
            .into_iter()
            .collect();

        let parsed = |description: &str, category: &str| ParsedTransaction {
            date: Utc::now().date_naive(),
            description: description.to_string(),
            amount: 10.0,
            transaction_type: TransactionType::Debit,
            category: category.to_string(),
        };

        let stored = ctx
            .service
            .store_transactions(
                statement_id,
                vec![parsed("Cafe", "Food & Dining"), parsed("Shoes", "Shopping")],
                &category_ids,
                food_id,
            )
            .await;

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].description, "Cafe");
        let rows = TransactionRepository::new(ctx.db.clone())
            .list_for_statement(statement_id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_statement_name_defaults_to_file_name() {
        let ctx = setup_test(ScriptedGenerator::new(["[]"])).await;
        let mut command = upload("my statement.csv", CSV_STATEMENT);
        command.statement_name = None;

        let result = ctx.service.process_upload(ctx.user_id, command).await.unwrap();
        assert!(result.transactions.is_empty());

        let details = ctx
            .service
            .get_statement_details(ctx.user_id, result.statement_id)
            .await
            .unwrap();
        assert_eq!(details.statement.statement_name, "my_statement.csv");
        assert_eq!(details.statement.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_unsupported_format_stores_nothing() {
        let model = Arc::new(ScriptedGenerator::new(Vec::<String>::new()));
        let db = DbConnection::init_test().await.unwrap();
        let user_id = UserRepository::new(db.clone())
            .store_user("ada@example.com", "hash", None, None, Utc::now())
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let service = StatementService::new(
            db,
            StatementParser::new(model.clone(), ParserSettings::default()),
            dir.path().to_path_buf(),
        );

        let result = service.process_upload(user_id, upload("statement.doc", b"binary")).await;

        assert!(matches!(
            result,
            Err(StatementError::Extraction(ExtractionError::UnsupportedFormat(_)))
        ));
        assert!(service.list_statements(user_id).await.unwrap().is_empty());
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_document_without_text_stores_nothing() {
        let ctx = setup_test(ScriptedGenerator::new(Vec::<String>::new())).await;

        let result = ctx.service.process_upload(ctx.user_id, upload("empty.csv", b"\n\n")).await;

        assert!(matches!(result, Err(StatementError::Extraction(ExtractionError::NoText))));
        assert!(ctx.service.list_statements(ctx.user_id).await.unwrap().is_empty());
        assert_eq!(leftover_uploads(&ctx), 0);
    }

    #[tokio::test]
    async fn test_model_failure_marks_statement_failed() {
        let ctx = setup_test(ScriptedGenerator::new(Vec::<String>::new()).then_fail("quota exceeded")).await;

        let result = ctx
            .service
            .process_upload(ctx.user_id, upload("march.csv", CSV_STATEMENT))
            .await;
        assert!(matches!(result, Err(StatementError::Parse(ParseError::Model(_)))));

        let statements = ctx.service.list_statements(ctx.user_id).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].processing_status, ProcessingStatus::Failed);
        assert!(statements[0].processed_at.is_none());
    }

    #[tokio::test]
    async fn test_statements_are_owner_scoped() {
        let ctx = setup_test(ScriptedGenerator::new([EXTRACTED, CATEGORIZED])).await;
        let result = ctx
            .service
            .process_upload(ctx.user_id, upload("march.csv", CSV_STATEMENT))
            .await
            .unwrap();

        let other_user = UserRepository::new(ctx.db.clone())
            .store_user("bob@example.com", "hash", None, None, Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            ctx.service.get_statement_details(other_user, result.statement_id).await,
            Err(StatementError::NotFound)
        ));
        assert!(matches!(
            ctx.service.delete_statement(other_user, result.statement_id).await,
            Err(StatementError::NotFound)
        ));
        assert!(ctx.service.list_statements(other_user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_statement_removes_transactions() {
        let ctx = setup_test(ScriptedGenerator::new([EXTRACTED, CATEGORIZED])).await;
        let result = ctx
            .service
            .process_upload(ctx.user_id, upload("march.csv", CSV_STATEMENT))
            .await
            .unwrap();

        ctx.service.delete_statement(ctx.user_id, result.statement_id).await.unwrap();

        assert!(matches!(
            ctx.service.get_statement_details(ctx.user_id, result.statement_id).await,
            Err(StatementError::NotFound)
        ));
        let remaining = TransactionRepository::new(ctx.db.clone())
            .list_for_statement(result.statement_id)
            .await
            .unwrap();
        assert!(remaining.is_empty());
        assert!(matches!(
            ctx.service.delete_statement(ctx.user_id, result.statement_id).await,
            Err(StatementError::NotFound)
        ));
    }
}
