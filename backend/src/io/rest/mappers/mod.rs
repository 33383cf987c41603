//! Conversions between domain models and the DTOs in the `shared` crate.

pub mod category_mapper;
pub mod statement_mapper;
pub mod transaction_mapper;
pub mod user_mapper;

use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) fn to_api_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
