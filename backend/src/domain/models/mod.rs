pub mod category;
pub mod statement;
pub mod transaction;
pub mod user;
