use anyhow::Result;

use crate::domain::models::category::Category;
use crate::storage::{CategoryRepository, DbConnection};

/// Read access to the category taxonomy
#[derive(Clone)]
pub struct CategoryService {
    category_repository: CategoryRepository,
}

impl CategoryService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            category_repository: CategoryRepository::new(db),
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.category_repository.list_categories().await
    }
}
