use anyhow::Result;
use sqlx::Row;

use crate::domain::models::category::Category;
use crate::storage::connection::DbConnection;

/// Repository for the category taxonomy
#[derive(Clone)]
pub struct CategoryRepository {
    db: DbConnection,
}

impl CategoryRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// List all categories in taxonomy order
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description FROM categories ORDER BY id ASC")
            .fetch_all(self.db.pool())
            .await?;

        let categories = rows
            .iter()
            .map(|row| Category {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
            })
            .collect();

        Ok(categories)
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| Category {
            id: r.get("id"),
            name: r.get("name"),
            description: r.get("description"),
        }))
    }
}
