//! Two-phase import: `preview` stages a batch without storing transactions,
//! `commit` stores a previously staged payload and refreshes budgets.

use bankin_core::{
    BudgetStore, CanonicalTransaction, Category, CategoryId, CategoryStore, ClassifiedTransaction,
    Direction, OwnerId, Period, TransactionStore,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::classify::{ensure_categories, Classifier};
use crate::dedup::partition;
use crate::error::{ImportError, Result};
use crate::format::{FormatHint, HEADER_TOKENS};
use crate::normalize::normalize;
use crate::rows::{RawRow, Upload};
use crate::settings::ImportSettings;

/// Result of a preview. Nothing here is stored; the caller hands `payload`
/// back to [`ImportCoordinator::commit`] to keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingBatch {
    #[serde(rename = "total")]
    pub total_parsed: usize,
    #[serde(rename = "new")]
    pub new_count: usize,
    #[serde(rename = "duplicates")]
    pub duplicate_count: usize,
    #[serde(rename = "transactions")]
    pub preview_new: Vec<ClassifiedTransaction>,
    #[serde(rename = "duplicatesPreview")]
    pub preview_duplicates: Vec<CanonicalTransaction>,
    #[serde(rename = "data")]
    pub payload: Vec<ClassifiedTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub count: usize,
}

pub struct ImportCoordinator<S> {
    store: Arc<S>,
    classifier: Classifier,
    settings: ImportSettings,
}

impl<S> ImportCoordinator<S>
where
    S: CategoryStore + TransactionStore + BudgetStore + 'static,
{
    pub fn new(store: Arc<S>, classifier: Classifier, settings: ImportSettings) -> Self {
        Self {
            store,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Normalizes, drops rows already stored, and classifies the rest.
    ///
    /// Transactions are never written. The one store mutation a preview can
    /// cause is provisioning starter categories for an owner who has none.
    pub async fn preview(&self, owner: OwnerId, rows: &[RawRow], hint: FormatHint) -> Result<StagingBatch> {
        let candidates = normalize(rows, hint);
        if candidates.is_empty() {
            return Err(ImportError::NoUsableRows);
        }
        let total_parsed = candidates.len();

        let split = partition(
            self.store.as_ref(),
            owner,
            candidates,
            self.settings.lookup_concurrency(),
        )
        .await?;

        let payload = self.classify_all(owner, split.new).await?;

        tracing::info!(
            owner = %owner,
            total = total_parsed,
            new = payload.len(),
            duplicates = split.duplicates.len(),
            "Staged import preview"
        );

        Ok(StagingBatch {
            total_parsed,
            new_count: payload.len(),
            duplicate_count: split.duplicates.len(),
            preview_new: payload
                .iter()
                .take(self.settings.preview_new_limit)
                .cloned()
                .collect(),
            preview_duplicates: split
                .duplicates
                .into_iter()
                .take(self.settings.preview_duplicate_limit)
                .collect(),
            payload,
        })
    }

    /// Reads rows out of an uploaded file and previews them. The upload is
    /// consumed and its file removed whether or not reading succeeds.
    pub async fn preview_upload(&self, owner: OwnerId, upload: Upload, hint: FormatHint) -> Result<StagingBatch> {
        let rows = tokio::task::spawn_blocking(move || upload.read_rows(HEADER_TOKENS)).await??;
        tracing::debug!("Read {} rows from upload", rows.len());
        self.preview(owner, &rows, hint).await
    }

    /// Stores `payload` in one atomic insert, then recomputes the spent total
    /// of every expense budget bucket it touched.
    ///
    /// The payload is stored as given: no re-normalization, no duplicate
    /// check, no re-classification. A failed recompute is logged and leaves
    /// the insert in place.
    pub async fn commit(&self, owner: OwnerId, payload: &[ClassifiedTransaction]) -> Result<CommitReceipt> {
        if payload.is_empty() {
            return Ok(CommitReceipt { count: 0 });
        }

        let count = self.store.insert_many(owner, payload).await?;
        tracing::info!(owner = %owner, count, "Committed import");

        let buckets: BTreeSet<(CategoryId, Period)> = payload
            .iter()
            .filter(|r| r.transaction.direction == Direction::Expense)
            .map(|r| (r.category_id, Period::containing(r.transaction.date)))
            .collect();

        let results = futures::future::join_all(
            buckets
                .iter()
                .map(|&(category, period)| self.recompute_budget(owner, category, period)),
        )
        .await;

        for ((category, period), result) in buckets.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("Failed to recompute budget {category} for {period}: {e}");
            }
        }

        Ok(CommitReceipt { count })
    }

    /// Sums the month's expenses in `category` and writes the total to the
    /// matching budget. `false` when there is no such budget.
    pub async fn recompute_budget(&self, owner: OwnerId, category: CategoryId, period: Period) -> Result<bool> {
        let spent = self
            .store
            .sum_amount(owner, category, Direction::Expense, period.range())
            .await?;
        let updated = self.store.set_spent(owner, category, period, spent).await?;
        if updated {
            tracing::debug!("Budget {category} for {period} spent = {spent}");
        }
        Ok(updated)
    }

    /// Classifies in input order against one category snapshot per direction.
    async fn classify_all(
        &self,
        owner: OwnerId,
        candidates: Vec<CanonicalTransaction>,
    ) -> Result<Vec<ClassifiedTransaction>> {
        let mut snapshots: HashMap<Direction, Vec<Category>> = HashMap::new();
        for direction in [Direction::Expense, Direction::Income] {
            if candidates.iter().any(|c| c.direction == direction) {
                let categories = ensure_categories(self.store.as_ref(), owner, direction).await?;
                snapshots.insert(direction, categories);
            }
        }

        let classifier = &self.classifier;
        let snapshots = &snapshots;
        let ids: Vec<CategoryId> = stream::iter(candidates.iter().map(|c| {
            let categories = snapshots
                .get(&c.direction)
                .map(Vec::as_slice)
                .unwrap_or_default();
            classifier.classify(&c.description, c.direction, categories)
        }))
        .buffered(self.settings.classify_concurrency())
        .try_collect()
        .await?;

        Ok(candidates
            .into_iter()
            .zip(ids)
            .map(|(c, id)| ClassifiedTransaction::new(c, id))
            .collect())
    }
}
