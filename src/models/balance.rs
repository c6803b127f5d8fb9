//! Account balance model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DEFAULT_CURRENCY;

/// Balance of one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Booked balance amount.
    #[serde(rename = "balance")]
    pub amount: f64,
    /// Three-letter currency code; EUR when the backend omits it.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Account number the balance belongs to (as requested or as reported).
    pub account_number: String,
    /// IBAN, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    /// Bank code (BLZ), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_code: Option<String>,
    /// Account holder name, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Date the bank attached to the balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Currency for replies that carry none.
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

impl Balance {
    /// Creates a balance with only amount, currency and account number set.
    #[inline]
    #[must_use]
    pub fn new<C: Into<String>, A: Into<String>>(amount: f64, currency: C, account: A) -> Self {
        Self {
            amount,
            currency: currency.into(),
            account_number: account.into(),
            iban: None,
            bank_code: None,
            account_name: None,
            date: None,
        }
    }
}
