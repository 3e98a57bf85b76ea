use bankin_core::{CanonicalTransaction, DateRange, OwnerId, TransactionStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDecision {
    New,
    /// Matches the stored transaction with this id.
    Duplicate { existing_id: i64 },
}

/// Candidates split by whether the store already holds them. Each side keeps
/// the input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    pub new: Vec<CanonicalTransaction>,
    pub duplicates: Vec<CanonicalTransaction>,
}

/// Same owner, same amount, same description text, and a stored date inside
/// the candidate's calendar day. Time of day does not matter.
pub async fn decide<S>(store: &S, owner: OwnerId, candidate: &CanonicalTransaction) -> Result<DuplicateDecision>
where
    S: TransactionStore + ?Sized,
{
    let day = DateRange::day_of(candidate.date);
    let existing = store
        .find_existing(owner, candidate.amount, &candidate.description, day)
        .await?;
    Ok(match existing {
        Some(existing_id) => DuplicateDecision::Duplicate { existing_id },
        None => DuplicateDecision::New,
    })
}

/// One decision per candidate, in input order. At most `concurrency` lookups
/// are in flight.
pub async fn decide_all<S>(
    store: &S,
    owner: OwnerId,
    candidates: &[CanonicalTransaction],
    concurrency: usize,
) -> Result<Vec<DuplicateDecision>>
where
    S: TransactionStore + ?Sized,
{
    stream::iter(candidates.iter().map(|c| decide(store, owner, c)))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Read-only: the store is queried, never written.
pub async fn partition<S>(
    store: &S,
    owner: OwnerId,
    candidates: Vec<CanonicalTransaction>,
    concurrency: usize,
) -> Result<Partition>
where
    S: TransactionStore + ?Sized,
{
    let decisions = decide_all(store, owner, &candidates, concurrency).await?;

    let mut out = Partition::default();
    for (candidate, decision) in candidates.into_iter().zip(decisions) {
        if let DuplicateDecision::Duplicate { existing_id } = decision {
            tracing::debug!(
                existing_id,
                "Duplicate of stored transaction: {} {}",
                candidate.date,
                candidate.description
            );
            out.duplicates.push(candidate);
        } else {
            out.new.push(candidate);
        }
    }

    tracing::info!(
        new = out.new.len(),
        duplicates = out.duplicates.len(),
        "Checked candidates against stored transactions"
    );
    Ok(out)
}
