//! In-memory store for pipeline tests.

use async_trait::async_trait;
use bankin_core::{
    BudgetStore, Category, CategoryId, CategoryStore, ClassifiedTransaction, DateRange, Direction,
    Money, NewCategory, OwnerId, Period, StoreError, TransactionStore,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MemoryFailure(pub &'static str);

#[derive(Default)]
struct Inner {
    categories: Vec<Category>,
    transactions: Vec<(OwnerId, ClassifiedTransaction)>,
    budgets: HashMap<(OwnerId, CategoryId, Period), Money>,
    fail_inserts: bool,
    fail_sums: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, owner: OwnerId, name: &str, direction: Direction) -> CategoryId {
        let mut inner = self.inner.lock().unwrap();
        let id = CategoryId(inner.categories.len() as i64 + 1);
        inner.categories.push(Category {
            id,
            owner_id: owner,
            name: name.to_string(),
            direction,
        });
        id
    }

    pub fn category_id(&self, owner: OwnerId, name: &str, direction: Direction) -> Option<CategoryId> {
        self.inner
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| c.owner_id == owner && c.name == name && c.direction == direction)
            .map(|c| c.id)
    }

    pub fn category_count(&self) -> usize {
        self.inner.lock().unwrap().categories.len()
    }

    pub fn add_budget(&self, owner: OwnerId, category: CategoryId, period: Period) {
        self.inner
            .lock()
            .unwrap()
            .budgets
            .insert((owner, category, period), Money::zero());
    }

    pub fn budget_spent(&self, owner: OwnerId, category: CategoryId, period: Period) -> Option<Money> {
        self.inner
            .lock()
            .unwrap()
            .budgets
            .get(&(owner, category, period))
            .copied()
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.lock().unwrap().transactions.len()
    }

    pub fn transactions(&self) -> Vec<ClassifiedTransaction> {
        self.inner
            .lock()
            .unwrap()
            .transactions
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn fail_inserts(&self) {
        self.inner.lock().unwrap().fail_inserts = true;
    }

    pub fn fail_sums(&self) {
        self.inner.lock().unwrap().fail_sums = true;
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn find_categories(
        &self,
        owner: OwnerId,
        direction: Direction,
    ) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .categories
            .iter()
            .filter(|c| c.owner_id == owner && c.direction == direction)
            .cloned()
            .collect())
    }

    async fn insert_categories(&self, categories: &[NewCategory]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut inserted = 0;
        for new in categories {
            let exists = inner.categories.iter().any(|c| {
                c.owner_id == new.owner_id && c.direction == new.direction && c.name == new.name
            });
            if exists {
                continue;
            }
            let id = CategoryId(inner.categories.len() as i64 + 1);
            inner.categories.push(Category {
                id,
                owner_id: new.owner_id,
                name: new.name.clone(),
                direction: new.direction,
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn find_existing(
        &self,
        owner: OwnerId,
        amount: Money,
        description: &str,
        day: DateRange,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transactions
            .iter()
            .position(|(o, t)| {
                *o == owner
                    && t.transaction.amount == amount
                    && t.transaction.description == description
                    && day.contains(t.transaction.date)
            })
            .map(|idx| idx as i64 + 1))
    }

    async fn insert_many(
        &self,
        owner: OwnerId,
        records: &[ClassifiedTransaction],
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_inserts {
            return Err(StoreError::backend(MemoryFailure("insert refused")));
        }
        inner
            .transactions
            .extend(records.iter().map(|r| (owner, r.clone())));
        Ok(records.len())
    }

    async fn sum_amount(
        &self,
        owner: OwnerId,
        category: CategoryId,
        direction: Direction,
        range: DateRange,
    ) -> Result<Money, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_sums {
            return Err(StoreError::backend(MemoryFailure("sum refused")));
        }
        Ok(inner
            .transactions
            .iter()
            .filter(|(o, t)| {
                *o == owner
                    && t.category_id == category
                    && t.transaction.direction == direction
                    && range.contains(t.transaction.date)
            })
            .map(|(_, t)| t.transaction.amount)
            .sum())
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn set_spent(
        &self,
        owner: OwnerId,
        category: CategoryId,
        period: Period,
        spent: Money,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.budgets.get_mut(&(owner, category, period)) {
            Some(slot) => {
                *slot = spent;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
