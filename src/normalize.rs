//! Locale-aware value normalization.
//!
//! Banking tools print amounts in German notation (`1.234,56`) and expect
//! dates on the command line in compact `YYYYMMDD` form. This module
//! converts between those encodings and the canonical model.

use chrono::{DateTime, Days, NaiveDate};

use crate::error::{BankingError, Result};
use crate::models::{COMPACT_DATE_FORMAT, DateRange, DateRangeSelector};

/// Parses a European-formatted decimal.
///
/// Every `.` is removed (thousands separator), then the first `,` becomes
/// the decimal point. The order matters: doing it the other way round
/// corrupts `1.234,56`.
///
/// The longest numeric prefix is used, so a trailing currency code or a
/// second comma is ignored: `-12,50 EUR` is `-12.5` and `1,2,3` is `1.2`.
/// Returns `None` when the input does not start with a number.
///
/// # Examples
///
/// ```
/// use aqbanking_rs::normalize::parse_european_decimal;
///
/// assert_eq!(parse_european_decimal("1.234,56"), Some(1234.56));
/// assert_eq!(parse_european_decimal("-12,50 EUR"), Some(-12.5));
/// assert_eq!(parse_european_decimal("n/a"), None);
/// ```
#[must_use]
pub fn parse_european_decimal(raw: &str) -> Option<f64> {
    let without_grouping: String = raw.trim().chars().filter(|&c| c != '.').collect();
    let normalized = without_grouping.replacen(',', ".", 1);
    numeric_prefix(&normalized)?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Longest leading `[+-]?\d*\.?\d*` of `text`, if it holds a digit.
fn numeric_prefix(text: &str) -> Option<&str> {
    let mut end = 0;
    let mut has_digit = false;
    let mut has_point = false;
    for (index, c) in text.char_indices() {
        match c {
            '+' | '-' if index == 0 => {}
            '0'..='9' => has_digit = true,
            '.' if !has_point => has_point = true,
            _ => break,
        }
        end = index + c.len_utf8();
    }
    if has_digit { text.get(..end) } else { None }
}

/// Resolves a symbolic date range relative to `today`.
///
/// Custom bounds are only consulted for [`DateRangeSelector::Custom`];
/// each may be absent independently.
#[must_use]
pub fn resolve_date_range(
    selector: DateRangeSelector,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    today: NaiveDate,
) -> DateRange {
    match selector {
        DateRangeSelector::All => DateRange::unbounded(),
        DateRangeSelector::Last30Days => trailing_days(today, 30),
        DateRangeSelector::Last90Days => trailing_days(today, 90),
        DateRangeSelector::Custom => DateRange {
            start_date: custom_start,
            end_date: custom_end,
        },
    }
}

/// `today - days ..= today`.
fn trailing_days(today: NaiveDate, days: u64) -> DateRange {
    DateRange {
        start_date: Some(today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)),
        end_date: Some(today),
    }
}

/// Parses a caller-supplied date.
///
/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, or an RFC 3339 timestamp (only the
/// date part is kept).
///
/// # Errors
///
/// Returns [`BankingError::Configuration`] if the input matches none of
/// the accepted forms.
pub fn parse_date_input(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, COMPACT_DATE_FORMAT))
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|ts| ts.date_naive()))
        .map_err(|err| BankingError::configuration(format!("invalid date `{trimmed}`: {err}")))
}

/// Parses an optional caller-supplied date, treating blank input as absent.
///
/// # Errors
///
/// Returns [`BankingError::Configuration`] for non-blank, unparsable input.
#[inline]
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse_date_input)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let value = actual.unwrap();
        assert!((value - expected).abs() < 1e-9, "{value} != {expected}");
    }

    #[test]
    fn thousands_and_decimal_separator() {
        approx(parse_european_decimal("1.234,56"), 1234.56);
        approx(parse_european_decimal("1.234.567,8"), 1_234_567.8);
    }

    #[test]
    fn plain_and_signed_values() {
        approx(parse_european_decimal("42"), 42.0);
        approx(parse_european_decimal("-0,99"), -0.99);
        approx(parse_european_decimal("  7,5 "), 7.5);
        approx(parse_european_decimal(",5"), 0.5);
    }

    #[test]
    fn dot_only_is_grouping() {
        approx(parse_european_decimal("1.000"), 1000.0);
    }

    #[test]
    fn only_first_comma_is_decimal_point() {
        approx(parse_european_decimal("1,2,3"), 1.2);
    }

    #[test]
    fn trailing_text_is_ignored() {
        approx(parse_european_decimal("-12,50 EUR"), -12.5);
        approx(parse_european_decimal("1.500,00EUR"), 1500.0);
        approx(parse_european_decimal("+3,25 (pending)"), 3.25);
    }

    #[test]
    fn leading_text_is_rejected() {
        assert_eq!(parse_european_decimal("EUR 12,50"), None);
        assert_eq!(parse_european_decimal("-,"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_european_decimal(""), None);
        assert_eq!(parse_european_decimal("EUR"), None);
        assert_eq!(parse_european_decimal("-"), None);
        assert_eq!(parse_european_decimal("inf"), None);
    }

    #[test]
    fn all_is_unbounded() {
        let range = resolve_date_range(DateRangeSelector::All, None, None, day(2024, 3, 1));
        assert!(range.is_unbounded());
    }

    #[test]
    fn last_30_days_ends_today() {
        let today = day(2024, 3, 1);
        let range = resolve_date_range(DateRangeSelector::Last30Days, None, None, today);
        assert_eq!(range.compact_start().as_deref(), Some("20240131"));
        assert_eq!(range.compact_end().as_deref(), Some("20240301"));
    }

    #[test]
    fn last_30_days_for_many_dates() {
        let mut today = day(2023, 12, 15);
        for _ in 0..120 {
            let range = resolve_date_range(DateRangeSelector::Last30Days, None, None, today);
            assert_eq!(range.end_date, Some(today));
            assert_eq!(
                range.start_date.map(|start| (today - start).num_days()),
                Some(30)
            );
            assert_eq!(range.compact_end().map(|s| s.len()), Some(8));
            today = today.succ_opt().unwrap();
        }
    }

    #[test]
    fn last_90_days_crosses_year() {
        let range = resolve_date_range(DateRangeSelector::Last90Days, None, None, day(2024, 2, 1));
        assert_eq!(range.compact_start().as_deref(), Some("20231103"));
    }

    #[test]
    fn custom_bounds_are_independent() {
        let start = day(2024, 1, 1);
        let range = resolve_date_range(DateRangeSelector::Custom, Some(start), None, day(2024, 6, 1));
        assert_eq!(range.start_date, Some(start));
        assert_eq!(range.end_date, None);
    }

    #[test]
    fn custom_bounds_ignored_for_symbolic_ranges() {
        let range = resolve_date_range(
            DateRangeSelector::All,
            Some(day(2020, 1, 1)),
            Some(day(2020, 2, 1)),
            day(2024, 6, 1),
        );
        assert!(range.is_unbounded());
    }

    #[test]
    fn date_input_formats() {
        assert_eq!(parse_date_input("2024-05-17").unwrap(), day(2024, 5, 17));
        assert_eq!(parse_date_input("20240517").unwrap(), day(2024, 5, 17));
        assert_eq!(
            parse_date_input("2024-05-17T10:00:00+02:00").unwrap(),
            day(2024, 5, 17)
        );
        assert!(matches!(
            parse_date_input("17.05.2024"),
            Err(BankingError::Configuration(_))
        ));
    }

    #[test]
    fn optional_date_blank_is_none() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-01-02")).unwrap(),
            Some(day(2024, 1, 2))
        );
    }
}
