use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::category::CategoryId;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Income,
    Expense,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Income => "income",
            Direction::Expense => "expense",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown direction: '{0}'")]
pub struct ParseDirectionError(pub String);

impl std::str::FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Direction::Income),
            "expense" => Ok(Direction::Expense),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// A normalized import candidate. `amount` is never negative; the sign lives
/// in `direction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub date: NaiveDateTime,
    pub description: String,
    pub amount: Money,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    #[serde(flatten)]
    pub transaction: CanonicalTransaction,
    pub category_id: CategoryId,
}

impl ClassifiedTransaction {
    pub fn new(transaction: CanonicalTransaction, category_id: CategoryId) -> Self {
        Self {
            transaction,
            category_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn sample() -> CanonicalTransaction {
        CanonicalTransaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap(),
            description: "스타벅스코리아".to_string(),
            amount: Money::from_cents(450_000),
            direction: Direction::Expense,
        }
    }

    #[test]
    fn direction_parse_and_display() {
        assert_eq!(Direction::from_str("Expense").unwrap(), Direction::Expense);
        assert_eq!(Direction::from_str(" income ").unwrap(), Direction::Income);
        assert!(Direction::from_str("transfer").is_err());
        assert_eq!(Direction::Income.to_string(), "income");
    }

    #[test]
    fn classified_serializes_flat() {
        let tx = ClassifiedTransaction::new(sample(), CategoryId(7));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["description"], "스타벅스코리아");
        assert_eq!(json["direction"], "expense");
        assert_eq!(json["category_id"], 7);
    }

    #[test]
    fn classified_json_roundtrip_preserves_payload() {
        let tx = ClassifiedTransaction::new(sample(), CategoryId(7));
        let json = serde_json::to_string(&tx).unwrap();
        let back: ClassifiedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
