use chrono::NaiveDate;
use shared::TransactionType;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A transaction read back from storage
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub statement_id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Non-negative; direction is carried by `transaction_type`
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: String,
}

/// A transaction produced by the parsing pipeline, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: String,
}

impl ParsedTransaction {
    pub fn is_debit(&self) -> bool {
        self.transaction_type == TransactionType::Debit
    }
}

pub fn parse_transaction_type(raw: &str) -> anyhow::Result<TransactionType> {
    match raw {
        "credit" => Ok(TransactionType::Credit),
        "debit" => Ok(TransactionType::Debit),
        other => Err(anyhow::anyhow!("Unknown transaction type: {}", other)),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
