//! Raw labeled rows → canonical transactions.

use bankin_core::{CanonicalTransaction, Direction, Money};
use chrono::{Local, NaiveDateTime};
use thiserror::Error;

use crate::format::{
    resolve_direction, FormatHint, KnownFormat, AMOUNT_LABEL_KEYWORDS, AMOUNT_POSITION,
    DATE_LABEL_KEYWORDS, DATE_POSITION, DESCRIPTION_LABEL_KEYWORDS, DESCRIPTION_POSITION,
    TYPE_LABEL_KEYWORDS,
};
use crate::parse::{normalize_description, parse_amount, parse_date};
use crate::rows::RawRow;

/// Why a row was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("no amount column")]
    MissingAmount,
    #[error("unparseable amount '{0}'")]
    UnparseableAmount(String),
    #[error("zero amount")]
    ZeroAmount,
}

/// The four cells a row contributes, after column binding.
#[derive(Debug, Default, PartialEq, Eq)]
struct BoundFields<'a> {
    date: Option<&'a str>,
    description: Option<&'a str>,
    amount: Option<&'a str>,
    type_text: Option<&'a str>,
}

/// Normalizes every row, dropping those without a usable non-zero amount.
/// Missing or unreadable dates become the current local time.
pub fn normalize(rows: &[RawRow], hint: FormatHint) -> Vec<CanonicalTransaction> {
    normalize_at(rows, hint, Local::now().naive_local())
}

/// Like [`normalize`] with an explicit fallback timestamp.
pub fn normalize_at(
    rows: &[RawRow],
    hint: FormatHint,
    now: NaiveDateTime,
) -> Vec<CanonicalTransaction> {
    let mut out = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        match normalize_row(row, hint, now) {
            Ok(tx) => {
                tracing::debug!(
                    row = idx,
                    amount = %tx.amount,
                    direction = %tx.direction,
                    "normalized {}",
                    tx.description
                );
                out.push(tx);
            }
            Err(reason) => {
                dropped += 1;
                tracing::warn!(row = idx, "Skipping row: {reason}");
            }
        }
    }

    let income = out.iter().filter(|t| t.direction == Direction::Income).count();
    tracing::info!(
        format = %hint,
        parsed = out.len(),
        income,
        expense = out.len() - income,
        dropped,
        "Normalized bank rows"
    );
    out
}

pub(crate) fn normalize_row(
    row: &RawRow,
    hint: FormatHint,
    now: NaiveDateTime,
) -> Result<CanonicalTransaction, RowRejection> {
    let (fields, format) = match hint {
        FormatHint::Known(format) => (bind_known(row, format), Some(format)),
        FormatHint::Auto => (bind_auto(row), None),
    };

    let raw_amount = fields.amount.ok_or(RowRejection::MissingAmount)?;
    let amount = parse_amount(raw_amount)
        .ok_or_else(|| RowRejection::UnparseableAmount(raw_amount.to_string()))?;
    let magnitude = Money::from_decimal(amount.abs());
    if magnitude.is_zero() {
        return Err(RowRejection::ZeroAmount);
    }

    let direction = resolve_direction(format, amount, fields.type_text.unwrap_or(""));

    let date = match fields.date.and_then(parse_date) {
        Some(date) => date,
        None => {
            tracing::debug!("Unreadable date {:?}, using processing time", fields.date);
            now
        }
    };

    Ok(CanonicalTransaction {
        date,
        description: normalize_description(fields.description),
        amount: magnitude,
        direction,
    })
}

/// Known formats: first alias that is present with a non-blank value.
fn bind_known(row: &RawRow, format: KnownFormat) -> BoundFields<'_> {
    let profile = format.profile();
    let pick = |aliases: &[&str]| {
        aliases
            .iter()
            .filter_map(|alias| row.get(alias))
            .find(|v| !v.trim().is_empty())
    };
    BoundFields {
        date: pick(profile.date_aliases),
        description: pick(profile.description_aliases),
        amount: pick(profile.amount_aliases),
        type_text: pick(profile.type_aliases),
    }
}

/// Auto mode: the first label containing a field keyword is that field's
/// column; date, description and amount fall back to fixed positions.
fn bind_auto(row: &RawRow) -> BoundFields<'_> {
    let column = |keywords: &[&str]| {
        row.labels().position(|label| {
            let label = label.to_lowercase();
            keywords.iter().any(|k| label.contains(k))
        })
    };
    let value = |keywords: &[&str], fallback: Option<usize>| {
        column(keywords).or(fallback).and_then(|idx| row.value_at(idx))
    };
    BoundFields {
        date: value(DATE_LABEL_KEYWORDS, Some(DATE_POSITION)),
        description: value(DESCRIPTION_LABEL_KEYWORDS, Some(DESCRIPTION_POSITION)),
        amount: value(AMOUNT_LABEL_KEYWORDS, Some(AMOUNT_POSITION)),
        type_text: value(TYPE_LABEL_KEYWORDS, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::PLACEHOLDER_DESCRIPTION;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn toss_row(date: &str, desc: &str, kind: &str, amount: &str) -> RawRow {
        RawRow::from_pairs([
            ("거래 일시", date),
            ("적요", desc),
            ("거래 유형", kind),
            ("거래 금액", amount),
            ("거래 후 잔액", "1,000,000"),
        ])
    }

    #[test]
    fn starbucks_scenario() {
        let rows = vec![RawRow::from_pairs([
            ("date", "2024-03-05 12:30:00"),
            ("description", "스타벅스코리아"),
            ("amount", "-4,500"),
        ])];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, Money::from_cents(450_000));
        assert_eq!(out[0].direction, Direction::Expense);
        assert_eq!(out[0].description, "스타벅스코리아");
        assert_eq!(
            out[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(12, 30, 0).unwrap()
        );
    }

    #[test]
    fn empty_amount_row_is_dropped() {
        let rows = vec![
            RawRow::from_pairs([("date", "2024-03-05"), ("description", "a"), ("amount", "")]),
            RawRow::from_pairs([("date", "2024-03-05"), ("description", "b"), ("amount", "100")]),
        ];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "b");
    }

    #[test]
    fn unparseable_and_zero_amounts_are_absent_not_zeroed() {
        let rows = vec![
            RawRow::from_pairs([("날짜", "2024-03-05"), ("내용", "x"), ("금액", "abc")]),
            RawRow::from_pairs([("날짜", "2024-03-05"), ("내용", "y"), ("금액", "0")]),
            RawRow::from_pairs([("날짜", "2024-03-05"), ("내용", "z"), ("금액", "0.00")]),
            RawRow::from_pairs([("날짜", "2024-03-05"), ("내용", "w"), ("금액", "0.001")]),
        ];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert!(out.is_empty());
    }

    #[test]
    fn every_output_is_unsigned_with_two_valued_direction() {
        let rows: Vec<RawRow> = ["-4,500", "100", "(20)", "₩3,000", "-0.5"]
            .iter()
            .map(|a| RawRow::from_pairs([("날짜", "2024-03-05"), ("내용", "t"), ("금액", *a)]))
            .collect();
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out.len(), 5);
        for tx in &out {
            assert!(!tx.amount.is_negative());
            assert!(matches!(tx.direction, Direction::Income | Direction::Expense));
        }
        let expenses = out.iter().filter(|t| t.direction == Direction::Expense).count();
        assert_eq!(expenses, 3);
    }

    #[test]
    fn positive_amount_overrides_withdrawal_label() {
        let rows = vec![RawRow::from_pairs([
            ("거래일자", "2024-03-05"),
            ("거래내용", "환불"),
            ("구분", "출금"),
            ("거래금액", "5,000"),
        ])];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out[0].direction, Direction::Income);
    }

    #[test]
    fn toss_aliases_and_sign() {
        let rows = vec![
            toss_row("2024-03-05 12:30:00", "스타벅스코리아", "체크카드결제", "-4,500"),
            toss_row("2024-03-06 00:01:00", "이자", "이자입금", "12"),
        ];
        let out = normalize_at(&rows, FormatHint::Known(KnownFormat::Toss), now());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].direction, Direction::Expense);
        assert_eq!(out[0].amount, Money::from_cents(450_000));
        assert_eq!(out[1].direction, Direction::Income);
        assert_eq!(out[1].description, "이자");
    }

    #[test]
    fn toss_skips_blank_alias_for_next_one() {
        let row = RawRow::from_pairs([
            ("거래 일시", ""),
            ("거래일자", "2024-03-05"),
            ("적요", "편의점"),
            ("거래 금액", "-1200"),
        ]);
        let out = normalize_at(&[row], FormatHint::Known(KnownFormat::Toss), now());
        assert_eq!(out[0].date.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn toss_ignores_balance_column() {
        let row = RawRow::from_pairs([
            ("거래 일시", "2024-03-05"),
            ("적요", "편의점"),
            ("거래 후 잔액", "99,000"),
        ]);
        let out = normalize_at(&[row], FormatHint::Known(KnownFormat::Toss), now());
        assert!(out.is_empty());
    }

    #[test]
    fn bad_or_missing_date_defaults_to_now() {
        let rows = vec![
            RawRow::from_pairs([("date", "someday"), ("description", "a"), ("amount", "-1")]),
            RawRow::from_pairs([("date", ""), ("description", "b"), ("amount", "-1")]),
        ];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|t| t.date == now()));
    }

    #[test]
    fn placeholder_description() {
        let rows = vec![RawRow::from_pairs([
            ("date", "2024-03-05"),
            ("description", "null"),
            ("amount", "-1"),
        ])];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out[0].description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn positional_fallback_when_labels_are_unknown() {
        let rows = vec![RawRow::from_pairs([
            ("A", "2024-03-05"),
            ("B", "GS25 편의점"),
            ("C", "-3,200"),
            ("D", "77,000"),
        ])];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "GS25 편의점");
        assert_eq!(out[0].amount, Money::from_cents(320_000));
        assert_eq!(out[0].direction, Direction::Expense);
    }

    #[test]
    fn auto_label_matching_is_case_insensitive_and_first_wins() {
        let rows = vec![RawRow::from_pairs([
            ("Posted Date", "2024-03-05"),
            ("Transaction Date", "2024-03-01"),
            ("Description", "Coffee"),
            ("Amount", "-4.50"),
        ])];
        let out = normalize_at(&rows, FormatHint::Auto, now());
        assert_eq!(out[0].date.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(out[0].amount, Money::from_cents(450));
    }

    #[test]
    fn normalize_row_reports_reason() {
        let row = RawRow::from_pairs([("date", "2024-03-05"), ("description", "a"), ("amount", "x")]);
        assert_eq!(
            normalize_row(&row, FormatHint::Auto, now()),
            Err(RowRejection::UnparseableAmount("x".to_string()))
        );
        let toss = RawRow::from_pairs([("거래 일시", "2024-03-05")]);
        assert_eq!(
            normalize_row(&toss, FormatHint::Known(KnownFormat::Toss), now()),
            Err(RowRejection::MissingAmount)
        );
    }
}
