use crate::domain::models::transaction::{format_date, ParsedTransaction, Transaction as DomainTransaction};
use shared::{ProcessedTransaction, Transaction as SharedTransaction};

pub struct TransactionMapper;

impl TransactionMapper {
    pub fn to_dto(domain: DomainTransaction) -> SharedTransaction {
        SharedTransaction {
            id: domain.id,
            statement_id: domain.statement_id,
            date: format_date(domain.date),
            description: domain.description,
            amount: domain.amount,
            transaction_type: domain.transaction_type,
            category: domain.category,
        }
    }

    pub fn to_dtos(domain: Vec<DomainTransaction>) -> Vec<SharedTransaction> {
        domain.into_iter().map(Self::to_dto).collect()
    }

    /// A freshly parsed transaction, which has no id yet
    pub fn to_processed_dto(parsed: ParsedTransaction) -> ProcessedTransaction {
        ProcessedTransaction {
            date: format_date(parsed.date),
            description: parsed.description,
            amount: parsed.amount,
            transaction_type: parsed.transaction_type,
            category: parsed.category,
        }
    }
}
