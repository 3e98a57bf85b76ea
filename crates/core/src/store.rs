//! Persistence contracts the import pipeline is written against.
//!
//! The pipeline never talks to a database directly; a backend implements
//! these traits (see `bankin-storage` for SQLite).

use async_trait::async_trait;
use thiserror::Error;

use crate::category::{Category, CategoryId, NewCategory};
use crate::money::Money;
use crate::period::{DateRange, Period};
use crate::transaction::{ClassifiedTransaction, Direction, OwnerId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(Money),
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_categories(
        &self,
        owner: OwnerId,
        direction: Direction,
    ) -> Result<Vec<Category>, StoreError>;

    /// Inserts what it can. Rows whose name already exists for the owner and
    /// direction are skipped rather than failing the batch. Returns the number
    /// actually inserted.
    async fn insert_categories(&self, categories: &[NewCategory]) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Id of a stored transaction with the same amount and description whose
    /// date falls inside `day`.
    async fn find_existing(
        &self,
        owner: OwnerId,
        amount: Money,
        description: &str,
        day: DateRange,
    ) -> Result<Option<i64>, StoreError>;

    /// All-or-nothing: either every record is stored or none is.
    async fn insert_many(
        &self,
        owner: OwnerId,
        records: &[ClassifiedTransaction],
    ) -> Result<usize, StoreError>;

    async fn sum_amount(
        &self,
        owner: OwnerId,
        category: CategoryId,
        direction: Direction,
        range: DateRange,
    ) -> Result<Money, StoreError>;
}

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Overwrites the spent total of the budget for `period`. Returns `false`
    /// when the owner has no budget for that category and month.
    async fn set_spent(
        &self,
        owner: OwnerId,
        category: CategoryId,
        period: Period,
        spent: Money,
    ) -> Result<bool, StoreError>;
}
