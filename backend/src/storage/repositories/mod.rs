// Repository modules
pub mod category_repository;
pub mod statement_repository;
pub mod summary_repository;
pub mod transaction_repository;
pub mod user_repository;

// Re-export repository types
pub use category_repository::CategoryRepository;
pub use statement_repository::StatementRepository;
pub use summary_repository::SummaryRepository;
pub use transaction_repository::{TransactionFilter, TransactionRepository};
pub use user_repository::UserRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as RFC 3339 text
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid stored timestamp: {}", raw))?
        .with_timezone(&Utc))
}

/// Fixed-width UTC form so stored timestamps sort lexically
pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
