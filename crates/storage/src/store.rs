use async_trait::async_trait;
use bankin_core::{
    BudgetStore, Category, CategoryId, CategoryStore, ClassifiedTransaction, DateRange, Direction,
    Money, NewCategory, OwnerId, Period, StoreError, TransactionStore,
};
use std::path::Path;

use crate::db::{self, DbPool, TransactionRow};

/// The store traits over one SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = db::create_db(path).await.map_err(StoreError::backend)?;
        tracing::debug!("Opened ledger database {}", path.display());
        Ok(Self::new(pool))
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = db::connect_in_memory().await.map_err(StoreError::backend)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn cents(amount: Money) -> Result<i64, StoreError> {
    amount.to_cents().ok_or(StoreError::AmountOutOfRange(amount))
}

#[async_trait]
impl CategoryStore for SqliteStore {
    async fn find_categories(
        &self,
        owner: OwnerId,
        direction: Direction,
    ) -> Result<Vec<Category>, StoreError> {
        db::get_categories(&self.pool, owner, direction)
            .await
            .map_err(StoreError::backend)
    }

    async fn insert_categories(&self, categories: &[NewCategory]) -> Result<usize, StoreError> {
        db::insert_categories(&self.pool, categories)
            .await
            .map_err(StoreError::backend)
    }
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn find_existing(
        &self,
        owner: OwnerId,
        amount: Money,
        description: &str,
        day: DateRange,
    ) -> Result<Option<i64>, StoreError> {
        db::find_transaction(&self.pool, owner, cents(amount)?, description, day)
            .await
            .map_err(StoreError::backend)
    }

    async fn insert_many(
        &self,
        owner: OwnerId,
        records: &[ClassifiedTransaction],
    ) -> Result<usize, StoreError> {
        let rows = records
            .iter()
            .map(|r| TransactionRow::from_classified(r).ok_or(StoreError::AmountOutOfRange(r.transaction.amount)))
            .collect::<Result<Vec<_>, _>>()?;
        db::insert_transactions(&self.pool, owner, &rows)
            .await
            .map_err(StoreError::backend)
    }

    async fn sum_amount(
        &self,
        owner: OwnerId,
        category: CategoryId,
        direction: Direction,
        range: DateRange,
    ) -> Result<Money, StoreError> {
        let total = db::sum_transactions(&self.pool, owner, category, direction, range)
            .await
            .map_err(StoreError::backend)?;
        Ok(Money::from_cents(total))
    }
}

#[async_trait]
impl BudgetStore for SqliteStore {
    async fn set_spent(
        &self,
        owner: OwnerId,
        category: CategoryId,
        period: Period,
        spent: Money,
    ) -> Result<bool, StoreError> {
        db::update_budget_spent(&self.pool, owner, category, period, cents(spent)?)
            .await
            .map_err(StoreError::backend)
    }
}
