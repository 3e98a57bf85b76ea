pub mod db;
pub mod store;

pub use db::{
    connect_in_memory, count_transactions, create_budget, create_db, get_budget_spent, DbPool,
    DATE_FORMAT,
};
pub use store::SqliteStore;
