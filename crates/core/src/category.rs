use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::{Direction, OwnerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub owner_id: OwnerId,
    pub name: String,
    pub direction: Direction,
}

/// A category that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub owner_id: OwnerId,
    pub name: String,
    pub direction: Direction,
    pub is_default: bool,
}

/// Name of the catch-all category that exists for both directions.
pub const OTHER_CATEGORY_NAME: &str = "기타";

/// Starter categories provisioned for an owner who has none.
pub const DEFAULT_CATEGORIES: &[(&str, Direction)] = &[
    ("식비", Direction::Expense),
    ("교통비", Direction::Expense),
    ("쇼핑", Direction::Expense),
    ("의료/건강", Direction::Expense),
    ("교육", Direction::Expense),
    ("문화/여가", Direction::Expense),
    ("주거/통신", Direction::Expense),
    (OTHER_CATEGORY_NAME, Direction::Expense),
    ("급여", Direction::Income),
    ("부수입", Direction::Income),
    ("투자수익", Direction::Income),
    (OTHER_CATEGORY_NAME, Direction::Income),
];

/// The starter set for one direction, minus names the owner already has.
pub fn starter_categories(
    owner_id: OwnerId,
    direction: Direction,
    existing_names: &[&str],
) -> Vec<NewCategory> {
    DEFAULT_CATEGORIES
        .iter()
        .filter(|(_, d)| *d == direction)
        .filter(|(name, _)| !existing_names.contains(name))
        .map(|(name, d)| NewCategory {
            owner_id,
            name: name.to_string(),
            direction: *d,
            is_default: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_directions_have_an_other_category() {
        for direction in [Direction::Income, Direction::Expense] {
            assert!(DEFAULT_CATEGORIES
                .iter()
                .any(|(name, d)| *name == OTHER_CATEGORY_NAME && *d == direction));
        }
    }

    #[test]
    fn starter_set_is_filtered_by_direction() {
        let income = starter_categories(OwnerId(1), Direction::Income, &[]);
        assert_eq!(income.len(), 4);
        assert!(income.iter().all(|c| c.direction == Direction::Income));
        assert!(income.iter().all(|c| c.is_default && c.owner_id == OwnerId(1)));
    }

    #[test]
    fn starter_set_skips_existing_names() {
        let expense = starter_categories(OwnerId(1), Direction::Expense, &["식비", "기타"]);
        assert_eq!(expense.len(), 6);
        assert!(!expense.iter().any(|c| c.name == "식비" || c.name == "기타"));
    }
}
