//! # Storage Module
//!
//! Handles all data persistence for the statement analyzer.
//!
//! ## Current Implementation
//!
//! - **Primary Storage**: SQLite database accessed through SQLx
//! - **Schema**: created idempotently at start-up, with the category taxonomy seeded
//! - **Ownership**: every statement query that can be reached from the API is
//!   scoped to the requesting user
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: one repository per table, domain models in and out
//! - **Cascading Deletes**: removing a statement removes its transactions and summary
//! - **Testability**: every repository runs against a private in-memory database in tests

pub mod connection;
pub mod repositories;

// Re-export the main types that other modules need
pub use connection::{DbConnection, DEFAULT_CATEGORIES, FALLBACK_CATEGORY};
pub use repositories::{
    CategoryRepository, StatementRepository, SummaryRepository, TransactionFilter,
    TransactionRepository, UserRepository,
};
