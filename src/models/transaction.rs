//! Transaction model.

use serde::{Deserialize, Serialize};

/// Currency assumed when a backend does not report one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// A booked transaction, normalized across backends.
///
/// Every string field is present in the serialized form; fields a backend
/// did not report are empty strings, never `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    /// Signed amount (negative for debits).
    pub amount: f64,
    /// Three-letter currency code.
    pub currency: String,
    /// Booking date as reported by the backend.
    pub date: String,
    /// Value (valuta) date as reported by the backend.
    pub valuta_date: String,
    /// Counterparty name.
    pub remote_name: String,
    /// Purpose / memo text.
    pub purpose: String,
    /// Counterparty IBAN.
    #[serde(rename = "remoteIBAN")]
    pub remote_iban: String,
    /// Counterparty BIC.
    #[serde(rename = "remoteBIC")]
    pub remote_bic: String,
    /// Bank transaction code.
    pub transaction_code: String,
    /// End-to-end or bank reference.
    pub reference: String,
    /// Bank's booking text (`Buchungstext`), e.g. `LASTSCHRIFT`.
    pub booking_text: String,
    /// Primanota number of the booking.
    pub prima_nota_number: String,
}

impl Default for Transaction {
    #[inline]
    fn default() -> Self {
        Self {
            amount: 0.0,
            currency: DEFAULT_CURRENCY.to_owned(),
            date: String::new(),
            valuta_date: String::new(),
            remote_name: String::new(),
            purpose: String::new(),
            remote_iban: String::new(),
            remote_bic: String::new(),
            transaction_code: String::new(),
            reference: String::new(),
            booking_text: String::new(),
            prima_nota_number: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_eur_with_empty_strings() {
        let tx = Transaction::default();
        assert!(tx.amount.abs() < f64::EPSILON);
        assert_eq!(tx.currency, "EUR");
        assert!(tx.date.is_empty());
        assert!(tx.remote_iban.is_empty());
    }

    #[test]
    fn serialize_uses_upper_case_iban_bic_keys() {
        let tx = Transaction {
            amount: -42.5,
            remote_iban: "DE02120300000000202051".to_owned(),
            remote_bic: "BYLADEM1001".to_owned(),
            ..Transaction::default()
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["remoteIBAN"], "DE02120300000000202051");
        assert_eq!(value["remoteBIC"], "BYLADEM1001");
        assert_eq!(value["valutaDate"], "");
        assert_eq!(value["transactionCode"], "");
        assert_eq!(value["bookingText"], "");
        assert_eq!(value["primaNotaNumber"], "");
    }

    #[test]
    fn deserialize_fills_missing_fields() {
        let tx: Transaction = serde_json::from_str(r#"{"amount": 12.5, "purpose": "Rent"}"#).unwrap();
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.purpose, "Rent");
        assert!(tx.remote_name.is_empty());
        assert!(tx.booking_text.is_empty());
    }

    #[test]
    fn booking_text_and_prima_nota_keys() {
        let tx: Transaction = serde_json::from_str(
            r#"{"amount": -9.99, "bookingText": "LASTSCHRIFT", "primaNotaNumber": "931"}"#,
        )
        .unwrap();
        assert_eq!(tx.booking_text, "LASTSCHRIFT");
        assert_eq!(tx.prima_nota_number, "931");
    }
}
