//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer is responsible for mapping the
//! public DTOs defined in the `shared` crate to these internal types.

pub mod auth {
    /// Input for registering a new account.
    #[derive(Debug, Clone)]
    pub struct RegisterCommand {
        pub email: String,
        pub password: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    /// Input for logging in.
    #[derive(Debug, Clone)]
    pub struct LoginCommand {
        pub email: String,
        pub password: String,
    }

    /// Result of a successful login.
    #[derive(Debug, Clone)]
    pub struct LoginResult {
        pub user_id: i64,
        pub email: String,
        pub token: String,
    }
}

pub mod statements {
    use crate::domain::models::category::CategoryTotal;
    use crate::domain::models::statement::Statement;
    use crate::domain::models::transaction::{ParsedTransaction, Transaction};

    /// An uploaded file plus the optional metadata sent with it.
    #[derive(Clone)]
    pub struct UploadStatementCommand {
        /// File name as sent by the client, not yet sanitized
        pub file_name: String,
        pub bytes: Vec<u8>,
        pub statement_name: Option<String>,
        pub bank_name: Option<String>,
        pub statement_period: Option<String>,
    }

    impl std::fmt::Debug for UploadStatementCommand {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("UploadStatementCommand")
                .field("file_name", &self.file_name)
                .field("bytes", &self.bytes.len())
                .field("statement_name", &self.statement_name)
                .field("bank_name", &self.bank_name)
                .field("statement_period", &self.statement_period)
                .finish()
        }
    }

    /// Result of processing an upload.
    #[derive(Debug, Clone)]
    pub struct UploadStatementResult {
        pub statement_id: i64,
        pub transactions: Vec<ParsedTransaction>,
        /// Every category, zeros included
        pub summary: Vec<CategoryTotal>,
    }

    /// A statement with everything stored for it.
    #[derive(Debug, Clone)]
    pub struct StatementDetails {
        pub statement: Statement,
        pub transactions: Vec<Transaction>,
        /// Stored non-zero entries, largest first
        pub summary: Vec<CategoryTotal>,
    }
}

pub mod transactions {
    use crate::domain::models::category::CategoryTotal;

    /// Query parameters for listing transactions, as received.
    #[derive(Debug, Clone, Default)]
    pub struct TransactionListQuery {
        pub category: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    /// Query parameters for the cross-statement spending summary.
    #[derive(Debug, Clone, Default)]
    pub struct SpendingSummaryQuery {
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    /// Result of the spending summary query.
    #[derive(Debug, Clone)]
    pub struct SpendingSummaryResult {
        pub summary: Vec<CategoryTotal>,
        pub total_spent: f64,
    }
}
