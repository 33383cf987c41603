use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

/// Category taxonomy seeded into every database, in display order.
/// The last entry is the fallback for anything the model cannot place.
pub const DEFAULT_CATEGORIES: [(&str, &str); 8] = [
    ("Utilities", "Electricity, water, gas, phone and internet bills"),
    ("Food & Dining", "Groceries, restaurants, cafes and food delivery"),
    ("Travel & Transportation", "Fuel, public transport, ride hailing, flights and hotels"),
    ("Subscriptions", "Streaming, software and other recurring memberships"),
    ("EMIs or Loans", "Loan repayments, EMIs and credit card bill payments"),
    ("Shopping", "Retail, online shopping, clothing and electronics"),
    ("Healthcare", "Pharmacies, doctors, hospitals and insurance premiums"),
    ("Miscellaneous", "Anything that does not fit another category"),
];

pub const FALLBACK_CATEGORY: &str = "Miscellaneous";

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;

        Self::setup_schema(&pool).await?;
        Self::seed_categories(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS statements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                statement_name TEXT NOT NULL,
                bank_name TEXT,
                statement_period TEXT,
                file_name TEXT NOT NULL,
                processing_status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (processing_status IN ('pending', 'completed', 'failed')),
                processed_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Owner lookups back every statement listing
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_statements_user_id
            ON statements(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                statement_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('credit', 'debit')),
                category_id INTEGER NOT NULL,
                FOREIGN KEY (statement_id) REFERENCES statements (id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_statement_id
            ON transactions(statement_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_date
            ON transactions(date DESC);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spending_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                statement_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                total_amount REAL NOT NULL,
                UNIQUE (statement_id, category_id),
                FOREIGN KEY (statement_id) REFERENCES statements (id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert the default taxonomy, leaving existing rows untouched
    async fn seed_categories(pool: &SqlitePool) -> Result<()> {
        for (name, description) in DEFAULT_CATEGORIES {
            sqlx::query("INSERT OR IGNORE INTO categories (name, description) VALUES (?, ?)")
                .bind(name)
                .bind(description)
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}
