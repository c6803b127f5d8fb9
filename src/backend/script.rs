//! Backend running a python-fints bridge script.
//!
//! The script source is fixed; request parameters (including the PIN)
//! travel as one JSON document on standard input and never become part of
//! the program text. The script answers with one JSON object, either the
//! requested data or `{"error": ...}`.

use std::sync::Arc;

use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AccountQuery, Backend, BackendResponse, TransactionListing, TransactionQuery};
use crate::config::BankingConfig;
use crate::error::{BankingError, Result};
use crate::models::{Account, BackendKind, Balance, Operation, RecordKind, TanMethod, Transaction, User};
use crate::process::{Invocation, ProcessRunner, run_checked};

/// Bridge between the JSON protocol and python-fints.
const BRIDGE_SCRIPT: &str = include_str!("script/fints_bridge.py");

/// Error kind the script reports for unknown accounts.
const NOT_FOUND_KIND: &str = "notFound";

/// Request document written to the script's stdin.
///
/// Holds the exposed PIN and must not implement `Debug`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptParams<'a> {
    /// Requested operation.
    operation: Operation,
    /// Bank code.
    bank_code: &'a str,
    /// Login.
    user_id: &'a str,
    /// Customer id.
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<&'a str>,
    /// PIN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<&'a str>,
    /// FinTS server URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    server_url: Option<&'a str>,
    /// Display name reported by `listUsers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<&'a str>,
    /// TAN method selected when the bank offers it.
    tan_method_id: &'a str,
    /// TAN medium selected by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    tan_medium_name: Option<&'a str>,
    /// Target account.
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a str>,
    /// Start bound, `YYYYMMDD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    /// End bound, `YYYYMMDD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
}

/// `{"error": ...}` reply.
#[derive(Debug, Deserialize)]
struct ScriptFailure {
    /// Message.
    error: String,
    /// Machine-readable kind, if any.
    #[serde(default)]
    kind: Option<String>,
    /// Accounts the bank reported, for not-found errors.
    #[serde(default)]
    available: Vec<String>,
}

/// `getTransactions` reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsReply {
    /// Transactions.
    transactions: Vec<Transaction>,
    /// Account number.
    account_number: String,
    /// IBAN.
    #[serde(default)]
    iban: Option<String>,
    /// Bank code.
    #[serde(default)]
    bank_code: Option<String>,
}

/// `listAccounts` reply.
#[derive(Debug, Deserialize)]
struct AccountsReply {
    /// Accounts.
    accounts: Vec<Account>,
}

/// `listUsers` reply.
#[derive(Debug, Deserialize)]
struct UsersReply {
    /// Users.
    users: Vec<User>,
}

/// `getSystemId` reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemIdReply {
    /// System id.
    system_id: String,
}

/// `getTanMethods` reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TanMethodsReply {
    /// TAN methods.
    tan_methods: Vec<TanMethod>,
}

/// Backend that runs [`BRIDGE_SCRIPT`] through the configured interpreter.
#[derive(Debug)]
pub struct ScriptBackend {
    /// Shared settings.
    config: Arc<BankingConfig>,
    /// Process runner.
    runner: Arc<dyn ProcessRunner>,
}

impl ScriptBackend {
    /// Creates the backend.
    #[inline]
    #[must_use]
    pub const fn new(config: Arc<BankingConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    /// Request document for `operation` with the login filled in.
    fn params(&self, operation: Operation) -> ScriptParams<'_> {
        let config = &*self.config;
        ScriptParams {
            operation,
            bank_code: &config.bank_code,
            user_id: &config.user_id,
            customer_id: config.customer_id.as_deref(),
            pin: config.pin.as_ref().map(|pin| pin.expose_secret()),
            server_url: config.server_url.as_deref(),
            user_name: config.aqbanking_user_name.as_deref(),
            tan_method_id: &config.tan_method_id,
            tan_medium_name: config.tan_medium_name.as_deref(),
            account: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Runs the script and decodes its reply into `T`.
    fn call<T: DeserializeOwned>(
        &self,
        params: &ScriptParams<'_>,
        kind: RecordKind,
    ) -> Result<BackendResponse<T>> {
        self.config.require_login()?;
        let payload = SecretString::from(serde_json::to_string(params)?);
        let invocation = Invocation::new(self.config.python_path.as_str())
            .args(["-c", BRIDGE_SCRIPT])
            .stdin(payload);
        let output = run_checked(self.runner.as_ref(), BackendKind::Script, &invocation)?;

        let value: serde_json::Value =
            serde_json::from_str(output.trim()).map_err(|err| BankingError::BackendExecution {
                backend: BackendKind::Script,
                message: format!("script printed no JSON object: {err}"),
            })?;

        if value.get("error").is_some() {
            let failure: ScriptFailure =
                serde_json::from_value(value).map_err(|err| BankingError::Parse {
                    kind,
                    detail: format!("malformed error reply: {err}"),
                })?;
            return Err(Self::failure(failure, params.account));
        }

        let data = serde_json::from_value(value).map_err(|err| BankingError::Parse {
            kind,
            detail: err.to_string(),
        })?;
        Ok(BackendResponse::captured(data, output))
    }

    /// Converts a script error reply.
    fn failure(failure: ScriptFailure, account: Option<&str>) -> BankingError {
        if failure.kind.as_deref() == Some(NOT_FOUND_KIND) {
            return BankingError::NotFound {
                account: account.unwrap_or_default().to_owned(),
                available: failure.available,
            };
        }
        BankingError::BackendExecution {
            backend: BackendKind::Script,
            message: failure.error,
        }
    }
}

impl Backend for ScriptBackend {
    #[inline]
    fn kind(&self) -> BackendKind {
        BackendKind::Script
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn balance(&self, query: &AccountQuery) -> Result<BackendResponse<Balance>> {
        let params = ScriptParams {
            account: Some(&query.account),
            ..self.params(Operation::GetBalance)
        };
        self.call(&params, RecordKind::Balance)
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn transactions(&self, query: &TransactionQuery) -> Result<BackendResponse<TransactionListing>> {
        let params = ScriptParams {
            account: Some(&query.account.account),
            start_date: query.date_range.compact_start(),
            end_date: query.date_range.compact_end(),
            ..self.params(Operation::GetTransactions)
        };
        let response = self.call::<TransactionsReply>(&params, RecordKind::Transaction)?;
        Ok(response.map(|reply| TransactionListing {
            transactions: reply.transactions,
            account_number: reply.account_number,
            iban: reply.iban,
            bank_code: reply.bank_code,
        }))
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn list_accounts(&self) -> Result<BackendResponse<Vec<Account>>> {
        let params = self.params(Operation::ListAccounts);
        Ok(self
            .call::<AccountsReply>(&params, RecordKind::Account)?
            .map(|reply| reply.accounts))
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn list_users(&self) -> Result<BackendResponse<Vec<User>>> {
        let params = self.params(Operation::ListUsers);
        Ok(self
            .call::<UsersReply>(&params, RecordKind::User)?
            .map(|reply| reply.users))
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn system_id(&self) -> Result<BackendResponse<String>> {
        let params = self.params(Operation::GetSystemId);
        Ok(self
            .call::<SystemIdReply>(&params, RecordKind::SystemId)?
            .map(|reply| reply.system_id))
    }

    #[tracing::instrument(skip_all, fields(backend = "script"))]
    fn tan_methods(&self) -> Result<BackendResponse<Vec<TanMethod>>> {
        let params = self.params(Operation::GetTanMethods);
        Ok(self
            .call::<TanMethodsReply>(&params, RecordKind::TanMethod)?
            .map(|reply| reply.tan_methods))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::DateRange;
    use crate::process::testing::RecordingRunner;

    fn backend(runner: &Arc<RecordingRunner>) -> ScriptBackend {
        let config = BankingConfig {
            pin: Some(SecretString::from("geheim\" + os.system('x')".to_owned())),
            python_path: "/usr/bin/python3".to_owned(),
            ..BankingConfig::new("37040044", "max")
        };
        let shared: Arc<dyn ProcessRunner> = Arc::<RecordingRunner>::clone(runner);
        ScriptBackend::new(Arc::new(config), shared)
    }

    fn stdin_json(runner: &RecordingRunner) -> serde_json::Value {
        let stdin = runner.calls()[0].stdin.clone().unwrap();
        serde_json::from_str(&stdin).unwrap()
    }

    #[test]
    fn balance_reply_and_invocation() {
        let runner = Arc::new(RecordingRunner::ok(
            r#"{"balance": 250.75, "currency": "EUR", "accountNumber": "12345", "iban": "DE02120300000000202051"}"#,
        ));
        let response = backend(&runner).balance(&AccountQuery::new("12345")).unwrap();
        assert!((response.data.amount - 250.75).abs() < f64::EPSILON);
        assert_eq!(response.data.iban.as_deref(), Some("DE02120300000000202051"));

        let call = &runner.calls()[0];
        assert_eq!(call.program, "/usr/bin/python3");
        assert_eq!(call.args[0], "-c");
        assert!(call.args[1].contains("FinTS3PinTanClient"));
        assert!(!call.args[1].contains("geheim"));

        let params = stdin_json(&runner);
        assert_eq!(params["operation"], "getBalance");
        assert_eq!(params["account"], "12345");
        assert_eq!(params["pin"], "geheim\" + os.system('x')");
        assert!(params.get("startDate").is_none());
    }

    #[test]
    fn transactions_send_compact_dates() {
        let runner = Arc::new(RecordingRunner::ok(
            r#"{"transactions": [{"amount": -3.5, "currency": "EUR", "date": "2024-02-01", "purpose": "Kaffee"}], "accountNumber": "12345"}"#,
        ));
        let query = TransactionQuery {
            account: AccountQuery::new("12345"),
            date_range: DateRange {
                start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 2, 29),
            },
        };
        let response = backend(&runner).transactions(&query).unwrap();
        assert_eq!(response.data.transactions[0].purpose, "Kaffee");
        assert!(response.data.transactions[0].remote_name.is_empty());
        let params = stdin_json(&runner);
        assert_eq!(params["startDate"], "20240201");
        assert_eq!(params["endDate"], "20240229");
    }

    #[test]
    fn booking_and_value_dates_stay_apart() {
        let runner = Arc::new(RecordingRunner::ok(
            r#"{"transactions": [{"amount": 10.0, "date": "2024-03-01", "valutaDate": "2024-03-04", "bookingText": "GUTSCHRIFT", "primaNotaNumber": "9201"}], "accountNumber": "12345"}"#,
        ));
        let query = TransactionQuery {
            account: AccountQuery::new("12345"),
            date_range: DateRange::unbounded(),
        };
        let response = backend(&runner).transactions(&query).unwrap();
        let tx = &response.data.transactions[0];
        assert_eq!(tx.date, "2024-03-01");
        assert_eq!(tx.valuta_date, "2024-03-04");
        assert_eq!(tx.booking_text, "GUTSCHRIFT");
        assert_eq!(tx.prima_nota_number, "9201");
        assert_eq!(tx.currency, "EUR");
    }

    #[test]
    fn bridge_maps_entry_date_to_booking_date() {
        assert!(BRIDGE_SCRIPT.contains(r#""date": day(data.get("entry_date") or data.get("date"))"#));
        assert!(BRIDGE_SCRIPT.contains(r#""valutaDate": day(data.get("date"))"#));
        assert!(BRIDGE_SCRIPT.contains(r#""bookingText": text(data.get("posting_text"))"#));
        assert!(BRIDGE_SCRIPT.contains(r#""primaNotaNumber": text(data.get("prima_nota"))"#));
    }

    #[test]
    fn balance_without_currency_is_eur() {
        let runner = Arc::new(RecordingRunner::ok(r#"{"balance": 1.5, "accountNumber": "12345"}"#));
        let response = backend(&runner).balance(&AccountQuery::new("12345")).unwrap();
        assert_eq!(response.data.currency, "EUR");
        assert!((response.data.amount - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn tan_settings_are_sent() {
        let runner = Arc::new(RecordingRunner::ok(r#"{"tanMethods": []}"#));
        let config = BankingConfig {
            tan_method_id: "921".to_owned(),
            tan_medium_name: Some("Handy".to_owned()),
            ..BankingConfig::new("37040044", "max")
        };
        let shared: Arc<dyn ProcessRunner> = Arc::<RecordingRunner>::clone(&runner);
        let backend = ScriptBackend::new(Arc::new(config), shared);
        assert!(backend.tan_methods().unwrap().data.is_empty());

        let params = stdin_json(&runner);
        assert_eq!(params["tanMethodId"], "921");
        assert_eq!(params["tanMediumName"], "Handy");
        assert!(BRIDGE_SCRIPT.contains("set_tan_mechanism"));
    }

    #[test]
    fn default_tan_method_is_sent_without_medium() {
        let runner = Arc::new(RecordingRunner::ok(r#"{"systemId": "S"}"#));
        drop(backend(&runner).system_id().unwrap());
        let params = stdin_json(&runner);
        assert_eq!(params["tanMethodId"], "999");
        assert!(params.get("tanMediumName").is_none());
    }

    #[test]
    fn error_reply_is_execution_error() {
        let runner = Arc::new(RecordingRunner::ok(r#"{"error": "PIN wrong"}"#));
        let err = backend(&runner).list_accounts().unwrap_err();
        match err {
            BankingError::BackendExecution { backend, message } => {
                assert_eq!(backend, BackendKind::Script);
                assert_eq!(message, "PIN wrong");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn not_found_reply() {
        let runner = Arc::new(RecordingRunner::ok(
            r#"{"error": "account 9 not found", "kind": "notFound", "available": ["DE01", "DE02"]}"#,
        ));
        let err = backend(&runner).balance(&AccountQuery::new("9")).unwrap_err();
        assert_eq!(err.to_string(), "account 9 not found (available: DE01, DE02)");
    }

    #[test]
    fn missing_module_exit_is_execution_error() {
        let runner = Arc::new(RecordingRunner::with_replies([Ok(
            crate::process::ProcessOutput {
                stdout: r#"{"error": "python-fints is not installed"}"#.to_owned(),
                stderr: String::new(),
                exit_code: Some(1),
            },
        )]));
        let err = backend(&runner).system_id().unwrap_err();
        assert!(err.to_string().contains("python-fints is not installed"));
    }

    #[test]
    fn garbage_output_is_execution_error() {
        let runner = Arc::new(RecordingRunner::ok("Traceback (most recent call last):"));
        assert!(matches!(
            backend(&runner).tan_methods(),
            Err(BankingError::BackendExecution { .. })
        ));
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let runner = Arc::new(RecordingRunner::ok(r#"{"tanMethods": "none"}"#));
        assert!(matches!(
            backend(&runner).tan_methods(),
            Err(BankingError::Parse {
                kind: RecordKind::TanMethod,
                ..
            })
        ));
    }

    #[test]
    fn interpreter_missing_is_unavailable() {
        let runner = Arc::new(RecordingRunner::with_replies([]));
        assert!(matches!(
            backend(&runner).list_users(),
            Err(BankingError::BackendUnavailable {
                backend: BackendKind::Script,
                ..
            })
        ));
    }

    #[test]
    fn users_and_system_id() {
        let runner = Arc::new(RecordingRunner::with_replies([
            Ok(crate::process::ProcessOutput {
                stdout: r#"{"users": [{"userId": "max", "userName": "", "bankCode": "37040044"}]}"#
                    .to_owned(),
                exit_code: Some(0),
                ..Default::default()
            }),
            Ok(crate::process::ProcessOutput {
                stdout: r#"{"systemId": "SYS-1"}"#.to_owned(),
                exit_code: Some(0),
                ..Default::default()
            }),
        ]));
        let backend = backend(&runner);
        assert_eq!(backend.list_users().unwrap().data[0].user_id, "max");
        assert_eq!(backend.system_id().unwrap().data, "SYS-1");
    }

    #[test]
    fn script_requires_login() {
        let runner: Arc<dyn ProcessRunner> = Arc::new(RecordingRunner::default());
        let backend = ScriptBackend::new(Arc::new(BankingConfig::default()), runner);
        assert!(matches!(
            backend.list_accounts(),
            Err(BankingError::Configuration(_))
        ));
    }
}
