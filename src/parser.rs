//! Parsers for the text output of the AqBanking tools.
//!
//! Block-structured listings (transactions, accounts, users) go through
//! [`parse_records`] and the per-kind rule tables in [`fields`]. Single
//! values (balance, system id, TAN methods) are located with regexes.

pub mod fields;
mod patterns;
mod records;

pub use fields::{FieldRule, FieldSchema, map_field, match_label};
pub use patterns::{ParsedBalance, parse_balance, parse_system_id, parse_tan_methods};
pub use records::{parse_default, parse_records};

use crate::models::{Account, Transaction, User};

/// Parses a transaction listing.
#[inline]
#[must_use]
pub fn parse_transactions(output: &str) -> Vec<Transaction> {
    parse_default(output)
}

/// Parses an account listing.
#[inline]
#[must_use]
pub fn parse_accounts(output: &str) -> Vec<Account> {
    parse_default(output)
}

/// Parses a user listing.
#[inline]
#[must_use]
pub fn parse_users(output: &str) -> Vec<User> {
    parse_default(output)
}
