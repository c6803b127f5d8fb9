//! Bank account model and the account matching policy.

use serde::{Deserialize, Serialize};

/// A bank account as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    /// National account number.
    pub account_number: String,
    /// IBAN, possibly with grouping spaces.
    pub iban: String,
    /// BIC (text backends also put the BLZ here).
    pub bic: String,
    /// German bank routing code (BLZ).
    pub bank_code: String,
    /// Account holder name.
    pub account_name: String,
    /// Name of the bank.
    pub bank_name: String,
    /// Account type as reported by the bank.
    pub account_type: String,
}

impl Account {
    /// Returns `true` if `identifier` names this account.
    ///
    /// See [`matches_account`] for the policy.
    #[inline]
    #[must_use]
    pub fn matches(&self, identifier: &str) -> bool {
        matches_account(&self.account_number, &self.iban, identifier)
    }

    /// Identifier shown to users: the IBAN when known, else the number.
    #[inline]
    #[must_use]
    pub fn display_id(&self) -> &str {
        if self.iban.is_empty() {
            &self.account_number
        } else {
            &self.iban
        }
    }
}

/// Account matching policy shared by every backend.
///
/// Matches on exact account number, exact IBAN, or IBAN with all
/// whitespace removed from both sides. Empty fields never match.
#[must_use]
pub fn matches_account(account_number: &str, iban: &str, identifier: &str) -> bool {
    if identifier.is_empty() {
        return false;
    }
    if !account_number.is_empty() && account_number == identifier {
        return true;
    }
    if iban.is_empty() {
        return false;
    }
    iban == identifier || strip_whitespace(iban) == strip_whitespace(identifier)
}

/// Removes every whitespace character.
fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
