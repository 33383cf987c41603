//! # Statement Parser
//!
//! Drives the two model round-trips that turn statement text into categorized
//! transactions:
//!
//! 1. **Extraction**: the (truncated) statement text goes out with a request for a
//!    JSON array of `{date, description, amount, type}` objects.
//! 2. **Categorization**: the extracted entries go out in batches together with the
//!    category taxonomy, and come back with a `category` field added.
//!
//! Model output is treated as untrusted text. The first `[` … last `]` span is
//! parsed as JSON and every entry is normalized on its own: bad dates fall back to
//! today, unknown categories fall back to the fallback category, and entries whose
//! amount cannot be read are dropped.
//!
//! Extraction decides which transactions exist. A categorization reply only
//! contributes categories: each reply entry is matched back to an extracted
//! transaction by description and amount (or by position when the reply has the
//! batch's length), and any transaction left without a match keeps the fallback
//! category.

use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use shared::TransactionType;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::language_model::TextGenerator;
use crate::domain::models::category::CategoryTotal;
use crate::domain::models::transaction::{format_date, parse_date, ParsedTransaction};

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid JSON array pattern"));
static AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9][0-9.,]*").expect("valid amount pattern"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Language model request failed: {0}")]
    Model(#[source] anyhow::Error),
}

/// Tunables for the parser
#[derive(Debug, Clone)]
pub struct ParserSettings {
    /// Statement characters sent for extraction
    pub text_limit: usize,
    /// Transactions per categorization request
    pub batch_size: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            text_limit: 5000,
            batch_size: 20,
        }
    }
}

/// Shape sent back to the model for categorization
#[derive(Debug, Serialize)]
struct PromptTransaction<'a> {
    date: String,
    description: &'a str,
    amount: f64,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
}

#[derive(Clone)]
pub struct StatementParser {
    model: Arc<dyn TextGenerator>,
    settings: ParserSettings,
}

impl StatementParser {
    pub fn new(model: Arc<dyn TextGenerator>, settings: ParserSettings) -> Self {
        Self { model, settings }
    }

    /// Extract and categorize transactions from statement text.
    ///
    /// `categories` is the taxonomy in display order; its last entry must be the
    /// fallback category.
    pub async fn parse(
        &self,
        text: &str,
        categories: &[String],
        today: NaiveDate,
    ) -> Result<Vec<ParsedTransaction>, ParseError> {
        let fallback = fallback_category(categories);

        let prompt = build_extraction_prompt(text, self.settings.text_limit);
        let reply = self.model.generate(&prompt).await.map_err(ParseError::Model)?;

        let extracted: Vec<ParsedTransaction> = extract_json_array(&reply)
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| normalize(entry, categories, &fallback, today))
            .collect();
        info!("Model extracted {} transactions", extracted.len());

        if extracted.is_empty() {
            return Ok(extracted);
        }

        let mut categorized = Vec::with_capacity(extracted.len());
        for batch in extracted.chunks(self.settings.batch_size.max(1)) {
            let prompt = build_categorization_prompt(categories, batch);
            let reply = self.model.generate(&prompt).await.map_err(ParseError::Model)?;

            match extract_json_array(&reply) {
                Some(entries) => categorized.extend(apply_categories(batch, &entries, categories, &fallback)),
                None => {
                    warn!(
                        "Categorization reply for a batch of {} was not a JSON array; using {}",
                        batch.len(),
                        fallback
                    );
                    categorized.extend(batch.iter().cloned().map(|mut tx| {
                        tx.category = fallback.clone();
                        tx
                    }));
                }
            }
        }

        Ok(categorized)
    }
}

fn fallback_category(categories: &[String]) -> String {
    categories
        .last()
        .cloned()
        .unwrap_or_else(|| crate::storage::FALLBACK_CATEGORY.to_string())
}

/// Truncate on a character boundary
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub fn build_extraction_prompt(text: &str, limit: usize) -> String {
    format!(
        r#"Extract transaction data from the following bank statement text.
For each transaction, provide: date, description, amount, and type (credit/debit).
Try to determine the date format used and standardize it to YYYY-MM-DD format.
If the transaction is money spent/going out, mark it as "debit".
If the transaction is money received/coming in, mark it as "credit".
Format the output as a JSON array.
Bank statement text:
{}
JSON Format:
[
  {{
    "date": "YYYY-MM-DD",
    "description": "Transaction description",
    "amount": 123.45,
    "type": "credit or debit"
  }}
]
"#,
        truncate_chars(text, limit)
    )
}

pub fn build_categorization_prompt(categories: &[String], batch: &[ParsedTransaction]) -> String {
    let entries: Vec<PromptTransaction<'_>> = batch
        .iter()
        .map(|tx| PromptTransaction {
            date: format_date(tx.date),
            description: &tx.description,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
        })
        .collect();
    let batch_json = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Categorize the following transactions into these categories:
{}
Transactions:
{}
For each transaction, add a "category" field. Choose the most appropriate category based on the transaction description.
Return the result as a JSON array.
"#,
        categories.join(", "),
        batch_json
    )
}

/// Parse the outermost bracketed span of a model reply as a JSON array
pub fn extract_json_array(reply: &str) -> Option<Vec<Value>> {
    let span = JSON_ARRAY.find(reply)?;
    match serde_json::from_str::<Vec<Value>>(span.as_str()) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!("Model reply contained an invalid JSON array: {}", e);
            None
        }
    }
}

/// Copy categories from a categorization reply onto the extracted batch.
///
/// The batch is returned in full and unchanged apart from `category`.
pub fn apply_categories(
    batch: &[ParsedTransaction],
    entries: &[Value],
    categories: &[String],
    fallback: &str,
) -> Vec<ParsedTransaction> {
    let positional = entries.len() == batch.len();
    let mut unused: Vec<Option<&Value>> = entries.iter().map(Some).collect();
    let mut unmatched = 0;

    let mut categorized = Vec::with_capacity(batch.len());
    for (index, tx) in batch.iter().enumerate() {
        let position = unused
            .iter()
            .position(|entry| entry.map_or(false, |entry| describes(entry, tx)))
            .or_else(|| (positional && unused[index].is_some()).then_some(index));

        let category = match position.and_then(|i| unused[i].take()) {
            Some(entry) => match_category(entry.get("category"), categories, fallback),
            None => {
                unmatched += 1;
                fallback.to_string()
            }
        };
        categorized.push(ParsedTransaction {
            category,
            ..tx.clone()
        });
    }

    if unmatched > 0 {
        warn!(
            "Categorization reply had no entry for {} of {} transactions; using {}",
            unmatched,
            batch.len(),
            fallback
        );
    }
    categorized
}

/// Whether a reply entry names the same description and amount as `tx`
fn describes(entry: &Value, tx: &ParsedTransaction) -> bool {
    let same_description = entry
        .get("description")
        .and_then(Value::as_str)
        .map_or(false, |d| d.trim().eq_ignore_ascii_case(&tx.description));
    let same_amount = entry
        .get("amount")
        .and_then(parse_amount)
        .map_or(false, |a| (a.abs() - tx.amount).abs() < 0.005);
    same_description && same_amount
}

/// Read an amount from a JSON number or a formatted string such as "$1,234.50",
/// "Rs. 1,250.00" or "1.234,56"
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount_text(s),
        _ => None,
    };
    amount.filter(|a| a.is_finite())
}

fn parse_amount_text(text: &str) -> Option<f64> {
    let found = AMOUNT.find(text)?;
    let token = found.as_str().trim_end_matches(|c: char| c == '.' || c == ',');
    let decimal = decimal_separator(token);

    let cleaned: String = token
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            c if Some(c) == decimal => Some('.'),
            _ => None,
        })
        .collect();
    let amount = cleaned.parse::<f64>().ok()?;

    // "(12.00)" and "12.00-" are accounting forms of -12.00
    let negative = text[..found.start()].contains('-')
        || (text.contains('(') && text.contains(')'))
        || text.trim_end().ends_with('-');
    Some(if negative { -amount } else { amount })
}

/// The separator that starts the fractional part, if any.
/// The later of `.` and `,` wins when both appear; a lone `,` is decimal only
/// when one or two digits follow it.
fn decimal_separator(token: &str) -> Option<char> {
    match (token.rfind('.'), token.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => (token.matches('.').count() == 1).then_some('.'),
        (None, Some(comma)) => {
            let digits_after = token.len() - comma - 1;
            (token.matches(',').count() == 1 && (1..=2).contains(&digits_after)).then_some(',')
        }
        (None, None) => None,
    }
}

/// Only an explicit credit marker makes a credit; everything else is money out
fn parse_type(value: Option<&Value>) -> TransactionType {
    match value.and_then(Value::as_str).map(|s| s.trim().to_ascii_lowercase()) {
        Some(t) if t == "credit" || t == "cr" => TransactionType::Credit,
        _ => TransactionType::Debit,
    }
}

fn match_category(value: Option<&Value>, categories: &[String], fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .and_then(|wanted| categories.iter().find(|c| c.eq_ignore_ascii_case(wanted)))
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// Normalize one model-produced entry; `None` when it carries no usable amount
pub fn normalize(
    entry: &Value,
    categories: &[String],
    fallback: &str,
    today: NaiveDate,
) -> Option<ParsedTransaction> {
    let object = entry.as_object()?;

    let signed_amount = match object.get("amount").and_then(parse_amount) {
        Some(amount) => amount,
        None => {
            warn!("Dropping transaction without a readable amount: {}", entry);
            return None;
        }
    };

    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_date)
        .unwrap_or(today);

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Some(ParsedTransaction {
        date,
        description,
        amount: signed_amount.abs(),
        transaction_type: parse_type(object.get("type")),
        category: match_category(object.get("category"), categories, fallback),
    })
}

/// Debit totals for every category in taxonomy order, zeros included.
/// Credits never count towards spending.
pub fn summarize(transactions: &[ParsedTransaction], categories: &[String]) -> Vec<CategoryTotal> {
    categories
        .iter()
        .map(|category| CategoryTotal {
            category: category.clone(),
            total_amount: transactions
                .iter()
                .filter(|tx| tx.is_debit() && &tx.category == category)
                .map(|tx| tx.amount)
                .sum(),
        })
        .collect()
}
