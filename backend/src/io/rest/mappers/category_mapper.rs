use crate::domain::models::category::{Category as DomainCategory, CategoryTotal as DomainCategoryTotal};
use shared::{Category as SharedCategory, CategoryTotal as SharedCategoryTotal};

pub struct CategoryMapper;

impl CategoryMapper {
    pub fn to_dto(domain: DomainCategory) -> SharedCategory {
        SharedCategory {
            id: domain.id,
            name: domain.name,
            description: domain.description,
        }
    }

    pub fn to_total_dto(domain: DomainCategoryTotal) -> SharedCategoryTotal {
        SharedCategoryTotal {
            category: domain.category,
            total_amount: domain.total_amount,
        }
    }

    pub fn to_total_dtos(domain: Vec<DomainCategoryTotal>) -> Vec<SharedCategoryTotal> {
        domain.into_iter().map(Self::to_total_dto).collect()
    }
}
