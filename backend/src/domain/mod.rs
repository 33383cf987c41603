//! # Domain Module
//!
//! Business logic of the statement analyzer. Services here know nothing about
//! HTTP; they take command structs from [`commands`], talk to storage through
//! the repositories and to the hosted model through [`language_model::TextGenerator`].
//!
//! ## Services
//!
//! - **AuthService**: registration, password login, token issue and verification
//! - **StatementService**: the upload pipeline plus statement lookups and deletion
//! - **TransactionService**: filtered transaction lists and spending summaries
//! - **CategoryService**: the category taxonomy

pub mod auth_service;
pub mod category_service;
pub mod commands;
pub mod document_text;
pub mod language_model;
pub mod models;
pub mod statement_parser;
pub mod statement_service;
pub mod transaction_service;

pub use auth_service::{AuthError, AuthService, AuthSettings};
pub use category_service::CategoryService;
pub use statement_parser::{ParserSettings, StatementParser};
pub use statement_service::{StatementError, StatementService};
pub use transaction_service::{TransactionQueryError, TransactionService};
