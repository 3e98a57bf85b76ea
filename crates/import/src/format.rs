use bankin_core::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A bank export layout the importer knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownFormat {
    /// Toss Bank account history. Columns: 거래 일시, 적요, 거래 유형,
    /// 거래 기관, 계좌번호, 거래 금액, 거래 후 잔액, 메모. Withdrawals carry a
    /// minus sign.
    Toss,
}

/// Fixed column aliases and sign convention for one known format.
#[derive(Debug)]
pub struct FormatProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub date_aliases: &'static [&'static str],
    pub description_aliases: &'static [&'static str],
    pub amount_aliases: &'static [&'static str],
    pub type_aliases: &'static [&'static str],
    /// Transaction-type labels that mark money coming in.
    pub income_labels: &'static [&'static str],
    /// Transaction-type labels that mark money going out.
    pub expense_labels: &'static [&'static str],
}

const TOSS: FormatProfile = FormatProfile {
    key: "toss",
    name: "Toss Bank",
    date_aliases: &["거래 일시", "거래일시", "날짜", "거래일자", "일자"],
    description_aliases: &["적요", "거래내용", "내용", "메모"],
    amount_aliases: &["거래 금액", "거래금액", "금액"],
    type_aliases: &["거래 유형", "거래유형", "구분"],
    income_labels: &["프로모션입금", "이자입금", "입금"],
    expense_labels: &["체크카드결제", "출금"],
};

pub const KNOWN_FORMATS: &[KnownFormat] = &[KnownFormat::Toss];

/// Labels that identify the header row of a CSV export whose header is not
/// on the first line.
pub const HEADER_TOKENS: &[&str] = &["거래 일시", "거래일시"];

impl KnownFormat {
    pub fn profile(self) -> &'static FormatProfile {
        match self {
            KnownFormat::Toss => &TOSS,
        }
    }

    pub fn key(self) -> &'static str {
        self.profile().key
    }

    pub fn from_key(key: &str) -> Option<Self> {
        KNOWN_FORMATS.iter().copied().find(|f| f.key() == key)
    }

    /// Sign is authoritative; type labels only decide when the amount has none.
    pub fn direction(self, amount: Decimal, type_text: &str) -> Option<Direction> {
        let profile = self.profile();
        if amount < Decimal::ZERO {
            return Some(Direction::Expense);
        }
        if amount > Decimal::ZERO {
            return Some(Direction::Income);
        }
        if profile.income_labels.iter().any(|l| type_text.contains(l)) {
            return Some(Direction::Income);
        }
        if profile.expense_labels.iter().any(|l| type_text.contains(l)) {
            return Some(Direction::Expense);
        }
        None
    }
}

impl fmt::Display for KnownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// How the caller wants column layout decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatHint {
    #[default]
    Auto,
    Known(KnownFormat),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown format: '{0}'")]
pub struct UnknownFormat(pub String);

impl std::str::FromStr for FormatHint {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if key.is_empty() || key == "auto" {
            return Ok(FormatHint::Auto);
        }
        KnownFormat::from_key(&key)
            .map(FormatHint::Known)
            .ok_or(UnknownFormat(key))
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatHint::Auto => f.write_str("auto"),
            FormatHint::Known(format) => f.write_str(format.key()),
        }
    }
}

// ── Auto-detection vocabulary ─────────────────────────────────────────────────

/// Substrings that mark a column label as carrying the date.
pub const DATE_LABEL_KEYWORDS: &[&str] = &["날짜", "일자", "일시", "date"];
pub const DESCRIPTION_LABEL_KEYWORDS: &[&str] = &["내용", "적요", "설명", "메모", "description"];
pub const AMOUNT_LABEL_KEYWORDS: &[&str] = &["금액", "amount"];
pub const TYPE_LABEL_KEYWORDS: &[&str] = &["구분", "입출", "유형", "type"];

/// Positions used when no label matches. Approximate by nature.
pub const DATE_POSITION: usize = 0;
pub const DESCRIPTION_POSITION: usize = 1;
pub const AMOUNT_POSITION: usize = 2;

/// Type-column text that implies money going out / coming in.
pub const EXPENSE_TYPE_KEYWORDS: &[&str] = &["출금", "지출", "결제", "withdrawal", "debit"];
pub const INCOME_TYPE_KEYWORDS: &[&str] = &["입금", "수입", "deposit", "credit"];

/// Picks a direction for one row. First applicable rule wins:
/// the known format's convention, the amount's sign, the type text, income.
pub fn resolve_direction(format: Option<KnownFormat>, amount: Decimal, type_text: &str) -> Direction {
    if let Some(direction) = format.and_then(|f| f.direction(amount, type_text)) {
        return direction;
    }
    if amount < Decimal::ZERO {
        return Direction::Expense;
    }
    if amount > Decimal::ZERO {
        return Direction::Income;
    }

    let lowered = type_text.to_lowercase();
    if EXPENSE_TYPE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Direction::Expense;
    }
    if INCOME_TYPE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Direction::Income;
    }
    Direction::Income
}
