use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date_time,
    r"(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})\.?[\sT]+(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?");
re!(re_date_only,
    r"(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})");

/// Label used when a row carries no usable description.
pub const PLACEHOLDER_DESCRIPTION: &str = "거래 내역";

/// Parses a bank amount cell, keeping its sign.
///
/// Quotes, thousands separators, whitespace and currency marks are removed;
/// accounting parentheses mean negative. Returns `None` for anything that is
/// not a number.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | ',' | '₩' | '$' | '원') && !c.is_whitespace())
        .collect();

    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s.as_str()),
    };
    if s.is_empty() {
        return None;
    }

    let value = Decimal::from_str(s.strip_prefix('+').unwrap_or(s)).ok()?;
    Some(if negative { -value } else { value })
}

/// Parses a date cell: date+time first, then date only, then a handful of
/// other layouts. `None` when nothing fits.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(c) = re_date_time().captures(s) {
        let num = |i: usize| c.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = c.get(1)?.as_str().parse::<i32>().ok()?;
        if let Some(dt) = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)
            .and_then(|d| d.and_hms_opt(num(4)?, num(5)?, num(6).unwrap_or(0)))
        {
            return Some(dt);
        }
    }

    if let Some(c) = re_date_only().captures(s) {
        let year = c.get(1)?.as_str().parse::<i32>().ok()?;
        let month = c.get(2)?.as_str().parse::<u32>().ok()?;
        let day = c.get(3)?.as_str().parse::<u32>().ok()?;
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    parse_date_fallback(s)
}

fn parse_date_fallback(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }

    for fmt in &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%d.%m.%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in &["%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d.%m.%Y", "%Y%m%d", "%y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Trimmed description, or the placeholder when the cell is blank or holds a
/// stringified null.
pub fn normalize_description(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() && s != "undefined" && s != "null" => s.to_string(),
        _ => PLACEHOLDER_DESCRIPTION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, sec)
            .unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_keeps_leading_minus() {
        assert_eq!(parse_amount("-4,500"), Some(dec("-4500")));
    }

    #[test]
    fn parse_amount_strips_quotes_and_spaces() {
        assert_eq!(parse_amount("\"-4,500\""), Some(dec("-4500")));
        assert_eq!(parse_amount(" 1 234 "), Some(dec("1234")));
    }

    #[test]
    fn parse_amount_currency_marks() {
        assert_eq!(parse_amount("₩12,000"), Some(dec("12000")));
        assert_eq!(parse_amount("12,000원"), Some(dec("12000")));
        assert_eq!(parse_amount("$99.99"), Some(dec("99.99")));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)"), Some(dec("-75.25")));
    }

    #[test]
    fn parse_amount_explicit_plus() {
        assert_eq!(parse_amount("+100"), Some(dec("100")));
    }

    #[test]
    fn parse_amount_zero_is_a_number() {
        assert_eq!(parse_amount("0"), Some(Decimal::ZERO));
    }

    #[test]
    fn parse_amount_invalid() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("-"), None);
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_with_time() {
        assert_eq!(parse_date("2024-03-05 12:30:00"), Some(ts(2024, 3, 5, 12, 30, 0)));
        assert_eq!(parse_date("2024.03.05 08:07"), Some(ts(2024, 3, 5, 8, 7, 0)));
    }

    #[test]
    fn parse_date_only() {
        assert_eq!(parse_date("2024/3/5"), Some(ts(2024, 3, 5, 0, 0, 0)));
        assert_eq!(parse_date("2024.03.05"), Some(ts(2024, 3, 5, 0, 0, 0)));
    }

    #[test]
    fn parse_date_fallback_formats() {
        assert_eq!(parse_date("03/05/2024"), Some(ts(2024, 3, 5, 0, 0, 0)));
        assert_eq!(parse_date("20240305"), Some(ts(2024, 3, 5, 0, 0, 0)));
        assert_eq!(
            parse_date("2024-03-05T12:30:00+09:00"),
            Some(ts(2024, 3, 5, 12, 30, 0))
        );
    }

    #[test]
    fn parse_date_invalid() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    // ── normalize_description ─────────────────────────────────────────────────

    #[test]
    fn description_is_trimmed() {
        assert_eq!(normalize_description(Some("  스타벅스  ")), "스타벅스");
    }

    #[test]
    fn description_placeholder_for_missing_values() {
        for raw in [None, Some(""), Some("   "), Some("undefined"), Some("null")] {
            assert_eq!(normalize_description(raw), PLACEHOLDER_DESCRIPTION);
        }
    }
}
