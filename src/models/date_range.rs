//! Resolved transaction date range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `strftime` pattern of the compact date form the banking tools expect.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Concrete date bounds, both optional.
///
/// Absence of both bounds means "no filtering". Serialized with the
/// compact `YYYYMMDD` form used on the tool command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Inclusive start date.
    #[serde(default, with = "compact_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive end date.
    #[serde(default, with = "compact_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// A range without bounds.
    #[inline]
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start_date: None,
            end_date: None,
        }
    }

    /// Returns `true` if neither bound is set.
    #[inline]
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// Start bound in `YYYYMMDD` form.
    #[inline]
    #[must_use]
    pub fn compact_start(&self) -> Option<String> {
        self.start_date.map(to_compact)
    }

    /// End bound in `YYYYMMDD` form.
    #[inline]
    #[must_use]
    pub fn compact_end(&self) -> Option<String> {
        self.end_date.map(to_compact)
    }
}

/// Formats a date as `YYYYMMDD`.
fn to_compact(date: NaiveDate) -> String {
    date.format(COMPACT_DATE_FORMAT).to_string()
}

/// Serde adapter for `Option<NaiveDate>` in `YYYYMMDD` form.
mod compact_date {
    use chrono::NaiveDate;
    use serde::{Deserialize as _, Deserializer, Serializer, de};

    use super::{COMPACT_DATE_FORMAT, to_compact};

    /// Serializes the date as `YYYYMMDD`.
    #[allow(
        clippy::ref_option,
        reason = "serde `with` modules receive a reference to the field"
    )]
    pub(super) fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match *date {
            Some(day) => serializer.serialize_some(&to_compact(day)),
            None => serializer.serialize_none(),
        }
    }

    /// Parses a `YYYYMMDD` string.
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| NaiveDate::parse_from_str(&raw, COMPACT_DATE_FORMAT).map_err(de::Error::custom))
            .transpose()
    }
}
