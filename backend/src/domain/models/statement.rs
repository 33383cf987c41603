use chrono::{DateTime, Utc};
use shared::ProcessingStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub id: i64,
    pub user_id: i64,
    pub statement_name: String,
    pub bank_name: Option<String>,
    pub statement_period: Option<String>,
    pub file_name: String,
    pub processing_status: ProcessingStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Statement row before it has been assigned an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewStatement {
    pub user_id: i64,
    pub statement_name: String,
    pub bank_name: Option<String>,
    pub statement_period: Option<String>,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

pub fn parse_status(raw: &str) -> anyhow::Result<ProcessingStatus> {
    match raw {
        "pending" => Ok(ProcessingStatus::Pending),
        "completed" => Ok(ProcessingStatus::Completed),
        "failed" => Ok(ProcessingStatus::Failed),
        other => Err(anyhow::anyhow!("Unknown processing status: {}", other)),
    }
}
