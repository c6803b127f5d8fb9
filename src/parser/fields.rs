//! Ordered label-to-field rule tables.
//!
//! Each record kind owns a fixed table of `(needles, field)` rows. A label
//! is lower-cased and the first row with a needle contained in it wins.
//! Row order is part of the contract: `"valutadate"` must reach the date
//! rule only after the amount and currency rules had their chance, and
//! `"remotename"` is claimed by the name rule before the IBAN rule.

use crate::models::{Account, RecordKind, Transaction, User};
use crate::normalize::parse_european_decimal;

/// One row of a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule<F: 'static> {
    /// Lower-case substrings, any of which selects this row.
    pub needles: &'static [&'static str],
    /// Field the value is stored into.
    pub field: F,
}

impl<F: Copy> FieldRule<F> {
    /// Creates a rule row.
    #[inline]
    #[must_use]
    pub const fn new(needles: &'static [&'static str], field: F) -> Self {
        Self { needles, field }
    }

    /// Returns `true` if any needle occurs in the lower-cased label.
    #[inline]
    #[must_use]
    pub fn accepts(&self, lower_label: &str) -> bool {
        self.needles.iter().any(|needle| lower_label.contains(needle))
    }
}

/// A record kind that can be filled from `label: value` lines.
pub trait FieldSchema: Default {
    /// Field selector for this record.
    type Field: Copy + core::fmt::Debug + 'static;

    /// Record kind, for logs and errors.
    const KIND: RecordKind;

    /// Line prefixes that open a new record block.
    const MARKERS: &'static [&'static str];

    /// Ordered rule table, evaluated first match wins.
    const RULES: &'static [FieldRule<Self::Field>];

    /// Stores `value` into `field`.
    fn assign(&mut self, field: Self::Field, value: &str);
}

/// Finds the field a label maps to, if any.
#[must_use]
pub fn match_label<F: Copy>(rules: &[FieldRule<F>], label: &str) -> Option<F> {
    let lower = label.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.accepts(&lower))
        .map(|rule| rule.field)
}

/// Maps one `label: value` pair into `record`.
///
/// Returns `true` if the label matched a rule (even when the value itself
/// could not be normalized); unmatched labels are dropped.
pub fn map_field<R: FieldSchema>(record: &mut R, label: &str, value: &str) -> bool {
    match match_label(R::RULES, label) {
        Some(field) => {
            tracing::trace!(kind = %R::KIND, label, ?field, "mapped field");
            record.assign(field, value);
            true
        }
        None => false,
    }
}

/// Transaction fields reachable from text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionField {
    /// Signed amount.
    Amount,
    /// Currency code.
    Currency,
    /// Booking date (valuta dates land here too).
    Date,
    /// Counterparty name.
    RemoteName,
    /// Purpose / memo.
    Purpose,
    /// Counterparty IBAN.
    RemoteIban,
    /// Counterparty BIC.
    RemoteBic,
    /// Transaction code.
    TransactionCode,
}

/// Transaction rule table.
const TRANSACTION_RULES: [FieldRule<TransactionField>; 8] = [
    FieldRule::new(&["value_value", "amount"], TransactionField::Amount),
    FieldRule::new(&["value_currency", "currency"], TransactionField::Currency),
    FieldRule::new(&["date", "valutadate"], TransactionField::Date),
    FieldRule::new(&["remotename", "name"], TransactionField::RemoteName),
    FieldRule::new(&["purpose", "memo", "reference"], TransactionField::Purpose),
    FieldRule::new(&["remoteiban", "iban"], TransactionField::RemoteIban),
    FieldRule::new(&["remotebic", "bic"], TransactionField::RemoteBic),
    FieldRule::new(&["transactioncode", "code"], TransactionField::TransactionCode),
];

impl FieldSchema for Transaction {
    type Field = TransactionField;

    const KIND: RecordKind = RecordKind::Transaction;
    const MARKERS: &'static [&'static str] = &["transaction ", "Transaction "];
    const RULES: &'static [FieldRule<TransactionField>] = &TRANSACTION_RULES;

    fn assign(&mut self, field: TransactionField, value: &str) {
        let text = value.to_owned();
        match field {
            TransactionField::Amount => {
                self.amount = parse_european_decimal(value).unwrap_or_else(|| {
                    tracing::warn!(value, "unparsable transaction amount, using 0");
                    0.0
                });
            }
            TransactionField::Currency => self.currency = text,
            // Booking and valuta dates share this slot; the last one wins.
            TransactionField::Date => self.date = text,
            TransactionField::RemoteName => self.remote_name = text,
            TransactionField::Purpose => self.purpose = text,
            TransactionField::RemoteIban => self.remote_iban = text,
            TransactionField::RemoteBic => self.remote_bic = text,
            TransactionField::TransactionCode => self.transaction_code = text,
        }
    }
}

/// Account fields reachable from text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    /// Account number.
    Number,
    /// IBAN.
    Iban,
    /// BIC or BLZ.
    Bic,
    /// Holder name.
    Name,
    /// Bank name.
    BankName,
    /// Account type.
    Type,
}

/// Account rule table.
const ACCOUNT_RULES: [FieldRule<AccountField>; 6] = [
    FieldRule::new(&["number", "nummer"], AccountField::Number),
    FieldRule::new(&["iban"], AccountField::Iban),
    FieldRule::new(&["bic", "blz"], AccountField::Bic),
    FieldRule::new(&["name", "owner"], AccountField::Name),
    FieldRule::new(&["bank"], AccountField::BankName),
    FieldRule::new(&["type", "typ"], AccountField::Type),
];

impl FieldSchema for Account {
    type Field = AccountField;

    const KIND: RecordKind = RecordKind::Account;
    const MARKERS: &'static [&'static str] = &["Account ", "Konto "];
    const RULES: &'static [FieldRule<AccountField>] = &ACCOUNT_RULES;

    fn assign(&mut self, field: AccountField, value: &str) {
        let text = value.to_owned();
        match field {
            AccountField::Number => self.account_number = text,
            AccountField::Iban => self.iban = text,
            AccountField::Bic => self.bic = text,
            AccountField::Name => self.account_name = text,
            AccountField::BankName => self.bank_name = text,
            AccountField::Type => self.account_type = text,
        }
    }
}

/// User fields reachable from text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    /// User identifier.
    Id,
    /// Display name.
    Name,
    /// Bank code.
    BankCode,
}

/// User rule table.
const USER_RULES: [FieldRule<UserField>; 3] = [
    FieldRule::new(&["id", "userid"], UserField::Id),
    FieldRule::new(&["name"], UserField::Name),
    FieldRule::new(&["bank", "blz"], UserField::BankCode),
];

impl FieldSchema for User {
    type Field = UserField;

    const KIND: RecordKind = RecordKind::User;
    const MARKERS: &'static [&'static str] = &["User ", "Benutzer "];
    const RULES: &'static [FieldRule<UserField>] = &USER_RULES;

    fn assign(&mut self, field: UserField, value: &str) {
        let text = value.to_owned();
        match field {
            UserField::Id => self.user_id = text,
            UserField::Name => self.user_name = text,
            UserField::BankCode => self.bank_code = text,
        }
    }
}
