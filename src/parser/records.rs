//! Marker-delimited record segmentation.

use super::fields::{FieldSchema, map_field};

/// Splits `raw` into records of type `R`.
///
/// Trimmed lines starting with one of `markers` open a new record. Every
/// other line is split at its first colon into a label and a value and fed
/// through the rule table of `R`. A record is emitted only if at least one
/// of its labels matched a rule; records keep their order of appearance.
#[must_use]
pub fn parse_records<R: FieldSchema>(raw: &str, markers: &[&str]) -> Vec<R> {
    let mut records = Vec::new();
    let mut current = R::default();
    let mut touched = false;

    for line in raw.lines().map(str::trim) {
        if markers.iter().any(|marker| line.starts_with(marker)) {
            if touched {
                records.push(core::mem::take(&mut current));
            } else {
                current = R::default();
            }
            touched = false;
            continue;
        }

        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        if map_field(&mut current, label.trim(), value.trim()) {
            touched = true;
        }
    }

    if touched {
        records.push(current);
    }

    tracing::trace!(kind = %R::KIND, count = records.len(), "parsed records");
    records
}

/// Parses records using the default markers of `R`.
#[inline]
#[must_use]
pub fn parse_default<R: FieldSchema>(raw: &str) -> Vec<R> {
    parse_records(raw, R::MARKERS)
}
