//! Response records produced by the dispatcher.
//!
//! Every response carries a `timestamp` and, when requested, the raw
//! backend output under `rawOutput`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Account, Balance, DateRange, Operation, OutputFormat, Resource, TanMethod, Transaction, User};

/// Text reported as raw output by backends that have none.
pub const NO_RAW_OUTPUT: &str = "Native FinTS implementation - no raw output available";

/// Raw backend output accompanying a parsed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// Captured standard output of the tool or script.
    Captured(String),
    /// The backend has no textual output (native client).
    Unavailable,
}

impl RawOutput {
    /// Text form for the `rawOutput` field.
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Captured(text) => text,
            Self::Unavailable => NO_RAW_OUTPUT.to_owned(),
        }
    }
}

/// Result of `getBalance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// Parsed balance.
    #[serde(flatten)]
    pub balance: Balance,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Result of `getTransactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    /// Transactions in backend order, possibly truncated.
    pub transactions: Vec<Transaction>,
    /// Number of entries in `transactions`.
    pub count: usize,
    /// Account the transactions belong to.
    pub account_number: String,
    /// IBAN, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    /// Bank code used for the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_code: Option<String>,
    /// Date bounds the query was issued with.
    pub date_range: DateRange,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl TransactionsResponse {
    /// Keeps at most `max` transactions (0 = unlimited) and recomputes
    /// `count`.
    #[inline]
    pub fn truncate(&mut self, max: usize) {
        if max > 0 {
            self.transactions.truncate(max);
        }
        self.count = self.transactions.len();
    }
}

/// Result of `exportTransactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    /// The underlying transaction listing.
    #[serde(flatten)]
    pub listing: TransactionsResponse,
    /// CSV rendering, present for [`OutputFormat::Csv`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_data: Option<String>,
    /// Format the caller asked for.
    pub format: OutputFormat,
}

/// Result of `listAccounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsResponse {
    /// Accounts in backend order.
    pub accounts: Vec<Account>,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Result of `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoResponse {
    /// The matched account.
    #[serde(flatten)]
    pub account: Account,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Result of `listUsers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    /// Users in backend order.
    pub users: Vec<User>,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Result of `getSystemId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemIdResponse {
    /// FinTS system identifier.
    pub system_id: String,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Result of `getTanMethods`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TanMethodsResponse {
    /// TAN methods in backend order.
    pub tan_methods: Vec<TanMethod>,
    /// Time the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Raw backend output, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Error record emitted for a failed batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Rendered error message.
    pub error: String,
    /// Operation that failed.
    pub operation: Operation,
    /// Resource the operation belonged to.
    pub resource: Resource,
}

/// Any record the dispatcher can return.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[allow(
    variant_size_differences,
    clippy::large_enum_variant,
    reason = "one record per request; boxing would only add indirection"
)]
pub enum OperationOutput {
    /// `getBalance`.
    Balance(BalanceResponse),
    /// `getTransactions`.
    Transactions(TransactionsResponse),
    /// `exportTransactions`.
    Export(ExportResponse),
    /// `listAccounts`.
    Accounts(AccountsResponse),
    /// `getAccountInfo`.
    AccountInfo(AccountInfoResponse),
    /// `listUsers`.
    Users(UsersResponse),
    /// `getSystemId`.
    SystemId(SystemIdResponse),
    /// `getTanMethods`.
    TanMethods(TanMethodsResponse),
    /// A batch item that failed under the continue-on-failure policy.
    Error(ErrorRecord),
}

impl OperationOutput {
    /// Returns the error record if this output is one.
    #[inline]
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorRecord> {
        match *self {
            Self::Error(ref record) => Some(record),
            Self::Balance(_)
            | Self::Transactions(_)
            | Self::Export(_)
            | Self::Accounts(_)
            | Self::AccountInfo(_)
            | Self::Users(_)
            | Self::SystemId(_)
            | Self::TanMethods(_) => None,
        }
    }

    /// Converts the output into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BankingError::Serialization`] if serialization
    /// fails.
    #[inline]
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn listing(n: usize) -> TransactionsResponse {
        TransactionsResponse {
            transactions: vec![Transaction::default(); n],
            count: n,
            account_number: "12345".to_owned(),
            iban: None,
            bank_code: None,
            date_range: DateRange::unbounded(),
            timestamp: timestamp(),
            raw_output: None,
        }
    }

    #[test]
    fn truncate_recomputes_count() {
        let mut response = listing(5);
        response.truncate(2);
        assert_eq!(response.transactions.len(), 2);
        assert_eq!(response.count, 2);
    }

    #[test]
    fn truncate_zero_is_unlimited() {
        let mut response = listing(5);
        response.truncate(0);
        assert_eq!(response.count, 5);
    }

    #[test]
    fn balance_response_flattens_balance() {
        let response = BalanceResponse {
            balance: Balance::new(1234.56, "EUR", "12345"),
            timestamp: timestamp(),
            raw_output: Some("Saldo : 1.234,56 EUR".to_owned()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!((value["balance"].as_f64().unwrap() - 1234.56).abs() < f64::EPSILON);
        assert_eq!(value["rawOutput"], "Saldo : 1.234,56 EUR");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn export_response_flattens_listing() {
        let response = ExportResponse {
            listing: listing(1),
            csv_data: Some("Date,Amount\n".to_owned()),
            format: OutputFormat::Csv,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["format"], "csv");
        assert_eq!(value["csvData"], "Date,Amount\n");
    }

    #[test]
    fn error_record_shape() {
        let output = OperationOutput::Error(ErrorRecord {
            error: "auth failed".to_owned(),
            operation: Operation::GetBalance,
            resource: Resource::Account,
        });
        let value = output.to_json().unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "error": "auth failed",
                "operation": "getBalance",
                "resource": "account"
            })
        );
        assert!(output.as_error().is_some());
    }

    #[test]
    fn raw_output_unavailable_text() {
        assert_eq!(RawOutput::Unavailable.into_text(), NO_RAW_OUTPUT);
        assert_eq!(RawOutput::Captured("x".to_owned()).into_text(), "x");
    }
}
