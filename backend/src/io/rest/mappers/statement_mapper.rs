use super::category_mapper::CategoryMapper;
use super::to_api_timestamp;
use super::transaction_mapper::TransactionMapper;
use crate::domain::commands::statements::{StatementDetails, UploadStatementResult};
use crate::domain::models::statement::Statement as DomainStatement;
use shared::{
    Statement as SharedStatement, StatementDetailResponse, StatementListResponse, UploadStatementResponse,
};

pub struct StatementMapper;

impl StatementMapper {
    pub fn to_dto(domain: DomainStatement) -> SharedStatement {
        SharedStatement {
            id: domain.id,
            statement_name: domain.statement_name,
            bank_name: domain.bank_name,
            statement_period: domain.statement_period,
            file_name: domain.file_name,
            processing_status: domain.processing_status,
            processed_at: domain.processed_at.map(to_api_timestamp),
            created_at: to_api_timestamp(domain.created_at),
        }
    }

    pub fn to_list_response(statements: Vec<DomainStatement>) -> StatementListResponse {
        StatementListResponse {
            statements: statements.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_upload_response(result: UploadStatementResult) -> UploadStatementResponse {
        UploadStatementResponse {
            statement_id: result.statement_id,
            transactions: result
                .transactions
                .into_iter()
                .map(TransactionMapper::to_processed_dto)
                .collect(),
            summary: CategoryMapper::to_total_dtos(result.summary),
        }
    }

    pub fn to_detail_response(details: StatementDetails) -> StatementDetailResponse {
        StatementDetailResponse {
            statement: Self::to_dto(details.statement),
            transactions: TransactionMapper::to_dtos(details.transactions),
            summary: CategoryMapper::to_total_dtos(details.summary),
        }
    }
}
