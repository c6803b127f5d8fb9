//! Regex-driven extractors for single-value outputs.
//!
//! Balances, system ids and TAN method listings are not block-structured,
//! so they are located with a fixed set of patterns instead of the field
//! rule tables.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use crate::error::{BankingError, Result};
use crate::models::{RecordKind, TanMethod};
use crate::normalize::parse_european_decimal;

/// Compiled patterns, keyed by source text.
static PATTERN_CACHE: LazyLock<Mutex<HashMap<&'static str, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Balance patterns, tried in order.
const BALANCE_PATTERNS: [&str; 3] = [
    r"(?i)(?:Wert|Value|Balance)\s*:\s*([\d,.-]+)\s*([A-Z]{3})",
    r"(?i)Saldo\s*:\s*([\d,.-]+)\s*([A-Z]{3})",
    r"(?i)([\d,.-]+)\s*([A-Z]{3})\s*(?:Saldo|Balance)",
];

/// System id line.
const SYSTEM_ID_PATTERN: &str = r"(?i)System.*ID.*:\s*(\S+)";

/// One TAN method per line: `<digits>: <name>`.
const TAN_METHOD_PATTERN: &str = r"(\d+):\s*(.+)";

/// Longest output excerpt quoted in parse errors.
const EXCERPT_LEN: usize = 120;

/// Returns the compiled form of a built-in pattern.
///
/// A poisoned cache only disables caching.
fn cached_regex(pattern: &'static str) -> Result<Regex> {
    if let Ok(cache) = PATTERN_CACHE.lock()
        && let Some(regex) = cache.get(pattern)
    {
        return Ok(regex.clone());
    }

    let regex = Regex::new(pattern)?;
    if let Ok(mut cache) = PATTERN_CACHE.lock() {
        let _previous = cache.insert(pattern, regex.clone());
    }
    Ok(regex)
}

/// Shortened, single-line output for error messages.
fn excerpt(output: &str) -> String {
    let flat = output.trim().replace('\n', " | ");
    if flat.chars().count() <= EXCERPT_LEN {
        return flat;
    }
    let mut short: String = flat.chars().take(EXCERPT_LEN).collect();
    short.push_str("...");
    short
}

/// A balance located in tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBalance {
    /// Normalized amount.
    pub amount: f64,
    /// Currency code as printed.
    pub currency: String,
}

/// Extracts the balance from tool output.
///
/// Patterns are tried in order; the first one that matches and whose
/// number normalizes wins.
///
/// # Errors
///
/// Returns [`BankingError::Parse`] if no pattern yields a finite amount.
pub fn parse_balance(output: &str) -> Result<ParsedBalance> {
    for pattern in BALANCE_PATTERNS {
        let regex = cached_regex(pattern)?;
        let Some(caps) = regex.captures(output) else {
            continue;
        };
        let (Some(number), Some(currency)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some(amount) = parse_european_decimal(number.as_str()) {
            return Ok(ParsedBalance {
                amount,
                currency: currency.as_str().to_owned(),
            });
        }
        tracing::debug!(pattern, number = number.as_str(), "balance pattern matched a non-number");
    }

    Err(BankingError::Parse {
        kind: RecordKind::Balance,
        detail: format!("no balance found in `{}`", excerpt(output)),
    })
}

/// Extracts the FinTS system id.
///
/// # Errors
///
/// Returns [`BankingError::Parse`] if no system id line is present.
pub fn parse_system_id(output: &str) -> Result<String> {
    cached_regex(SYSTEM_ID_PATTERN)?
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_owned())
        .ok_or_else(|| BankingError::Parse {
            kind: RecordKind::SystemId,
            detail: format!("no system id found in `{}`", excerpt(output)),
        })
}

/// Extracts TAN methods, one per matching line, in output order.
///
/// # Errors
///
/// Only fails if the built-in pattern cannot be compiled.
pub fn parse_tan_methods(output: &str) -> Result<Vec<TanMethod>> {
    let regex = cached_regex(TAN_METHOD_PATTERN)?;
    Ok(output
        .lines()
        .filter_map(|line| regex.captures(line))
        .filter_map(|caps| {
            let id = caps.get(1)?;
            let name = caps.get(2)?;
            Some(TanMethod {
                id: id.as_str().to_owned(),
                name: name.as_str().trim().to_owned(),
            })
        })
        .collect())
}
