//! Operation dispatcher.
//!
//! [`Dispatcher`] is the single entry point of the library: it validates a
//! [`Request`], forwards it to the backend chosen once at construction, and
//! shapes the backend result into the canonical response record
//! (timestamps, raw output, truncation, CSV export, bank code fallback).

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::backend::{AccountQuery, Backend, FintsConnector, TransactionQuery, create_backend};
use crate::config::BankingConfig;
use crate::error::{BankingError, Result};
use crate::export::to_csv;
use crate::models::{
    Account, AccountInfoResponse, AccountsResponse, BackendKind, BalanceResponse, DateRange,
    DateRangeSelector, ErrorRecord, ExportResponse, Operation, OperationOutput, OutputFormat,
    RawOutput, Resource, SystemIdResponse, TanMethodsResponse, TransactionsResponse,
    UsersResponse,
};
use crate::normalize::{parse_optional_date, resolve_date_range};
use crate::process::{ProcessRunner, SystemProcessRunner};

/// Output shaping options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    /// Accepted for compatibility; records are always canonical.
    pub simplify_output: bool,
    /// Attach the backend output under `rawOutput`.
    pub include_raw_output: bool,
    /// Keep at most this many transactions; `0` keeps all.
    pub max_results: usize,
    /// Export format.
    pub output_format: OutputFormat,
}

/// Per-request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameters {
    /// Account number or IBAN.
    pub account_number: Option<String>,
    /// Bank code overriding the configured one for this request.
    pub bank_code: Option<String>,
    /// Transaction date window.
    pub date_range: DateRangeSelector,
    /// Start date for [`DateRangeSelector::Custom`].
    pub start_date: Option<String>,
    /// End date for [`DateRangeSelector::Custom`].
    pub end_date: Option<String>,
    /// Output shaping.
    pub options: OutputOptions,
}

/// One banking request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Resource addressed.
    pub resource: Resource,
    /// Operation on that resource.
    pub operation: Operation,
    /// Parameters.
    #[serde(default)]
    pub params: Parameters,
}

impl Request {
    /// Request for `operation` on its own resource with default parameters.
    #[inline]
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            resource: operation.resource(),
            operation,
            params: Parameters::default(),
        }
    }

    /// Builds a request from wire names such as `("account", "getBalance")`.
    ///
    /// The pairing itself is checked by [`Dispatcher::execute`].
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] for an unknown resource or
    /// operation name.
    #[inline]
    pub fn from_names(resource: &str, operation: &str) -> Result<Self> {
        Ok(Self {
            resource: resource.parse().map_err(BankingError::Configuration)?,
            operation: operation.parse().map_err(BankingError::Configuration)?,
            params: Parameters::default(),
        })
    }

    /// Sets the target account.
    #[inline]
    #[must_use]
    pub fn account<T: Into<String>>(mut self, account: T) -> Self {
        self.params.account_number = Some(account.into());
        self
    }

    /// Replaces all parameters.
    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }
}

/// What a batch does when one request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the first error.
    #[default]
    Abort,
    /// Record the error in place of the result and carry on.
    Continue,
}

/// Builder for [`Dispatcher`].
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    /// Settings.
    config: Option<BankingConfig>,
    /// Process runner; the system runner when unset.
    runner: Option<Arc<dyn ProcessRunner>>,
    /// Native client.
    connector: Option<Arc<dyn FintsConnector>>,
}

impl DispatcherBuilder {
    /// Sets the configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: BankingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides how external programs are run.
    #[inline]
    #[must_use]
    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Supplies the in-process FinTS client used by the native backend.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn FintsConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the dispatcher and its backend.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] if no configuration was
    /// provided, or whatever [`create_backend`] reports.
    #[inline]
    pub fn build(self) -> Result<Dispatcher> {
        let config = Arc::new(
            self.config
                .ok_or_else(|| BankingError::configuration("configuration is required"))?,
        );
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(SystemProcessRunner));
        let backend = create_backend(Arc::clone(&config), runner, self.connector)?;
        Ok(Dispatcher { config, backend })
    }
}

/// Routes requests to the configured backend.
#[derive(Debug)]
pub struct Dispatcher {
    /// Settings shared with the backend.
    config: Arc<BankingConfig>,
    /// Backend chosen at construction.
    backend: Box<dyn Backend>,
}

impl Dispatcher {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Dispatcher using the system process runner and no native client.
    ///
    /// # Errors
    ///
    /// See [`DispatcherBuilder::build`].
    #[inline]
    pub fn new(config: BankingConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Backend variant in use.
    #[inline]
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Settings in use.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BankingConfig {
        &self.config
    }

    /// Executes one request.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] for a resource/operation
    /// mismatch or a missing account identifier (before the backend is
    /// touched), and propagates every backend error.
    #[tracing::instrument(skip_all, fields(resource = %request.resource, operation = %request.operation))]
    pub fn execute(&self, request: &Request) -> Result<OperationOutput> {
        let operation = request.operation;
        if operation.resource() != request.resource {
            return Err(BankingError::configuration(format!(
                "operation `{operation}` is not available for resource `{}`",
                request.resource
            )));
        }
        let params = &request.params;
        Ok(match operation {
            Operation::GetBalance => OperationOutput::Balance(self.balance(params)?),
            Operation::ListAccounts => OperationOutput::Accounts(self.accounts(params)?),
            Operation::GetAccountInfo => OperationOutput::AccountInfo(self.account_info(params)?),
            Operation::GetTransactions => {
                OperationOutput::Transactions(self.transactions(params)?)
            }
            Operation::ExportTransactions => OperationOutput::Export(self.export(params)?),
            Operation::ListUsers => OperationOutput::Users(self.users(params)?),
            Operation::GetSystemId => OperationOutput::SystemId(self.system_id(params)?),
            Operation::GetTanMethods => OperationOutput::TanMethods(self.tan_methods(params)?),
        })
    }

    /// Executes requests sequentially in input order.
    ///
    /// # Errors
    ///
    /// With [`FailurePolicy::Abort`] the first failing request's error is
    /// returned. With [`FailurePolicy::Continue`] this never fails; failed
    /// requests appear as [`OperationOutput::Error`] records.
    pub fn execute_batch(
        &self,
        requests: &[Request],
        policy: FailurePolicy,
    ) -> Result<Vec<OperationOutput>> {
        let mut outputs = Vec::with_capacity(requests.len());
        for request in requests {
            match self.execute(request) {
                Ok(output) => outputs.push(output),
                Err(err) if policy == FailurePolicy::Continue => {
                    tracing::warn!(operation = %request.operation, error = %err, "request failed, continuing");
                    outputs.push(OperationOutput::Error(ErrorRecord {
                        error: err.to_string(),
                        operation: request.operation,
                        resource: request.resource,
                    }));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outputs)
    }

    /// `getBalance`.
    fn balance(&self, params: &Parameters) -> Result<BalanceResponse> {
        let query = account_query(params)?;
        let response = self.backend.balance(&query)?;
        let mut balance = response.data;
        balance.bank_code = self.fallback_bank_code(balance.bank_code.take(), &query);
        Ok(BalanceResponse {
            balance,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// `getTransactions`.
    fn transactions(&self, params: &Parameters) -> Result<TransactionsResponse> {
        let query = TransactionQuery {
            account: account_query(params)?,
            date_range: requested_range(params)?,
        };
        let response = self.backend.transactions(&query)?;
        let listing = response.data;
        let account_number = if listing.account_number.trim().is_empty() {
            query.account.account.clone()
        } else {
            listing.account_number
        };

        let mut result = TransactionsResponse {
            count: listing.transactions.len(),
            transactions: listing.transactions,
            account_number,
            iban: listing.iban.filter(|iban| !iban.trim().is_empty()),
            bank_code: self.fallback_bank_code(listing.bank_code, &query.account),
            date_range: query.date_range,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        };
        result.truncate(params.options.max_results);
        tracing::debug!(count = result.count, "transactions ready");
        Ok(result)
    }

    /// `exportTransactions`.
    fn export(&self, params: &Parameters) -> Result<ExportResponse> {
        let listing = self.transactions(params)?;
        let format = params.options.output_format;
        let csv_data = match format {
            OutputFormat::Csv => Some(to_csv(&listing.transactions)?),
            OutputFormat::Json => None,
        };
        Ok(ExportResponse {
            listing,
            csv_data,
            format,
        })
    }

    /// `listAccounts`.
    fn accounts(&self, params: &Parameters) -> Result<AccountsResponse> {
        let response = self.backend.list_accounts()?;
        Ok(AccountsResponse {
            accounts: response
                .data
                .into_iter()
                .map(|account| self.with_default_bank_code(account))
                .collect(),
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// `getAccountInfo`.
    fn account_info(&self, params: &Parameters) -> Result<AccountInfoResponse> {
        let query = account_query(params)?;
        let response = self.backend.list_accounts()?;
        let mut accounts = response.data;
        let Some(position) = accounts
            .iter()
            .position(|account| account.matches(&query.account))
        else {
            return Err(BankingError::NotFound {
                available: accounts
                    .iter()
                    .map(|account| account.display_id().to_owned())
                    .collect(),
                account: query.account,
            });
        };
        let account = self.with_default_bank_code(accounts.swap_remove(position));
        Ok(AccountInfoResponse {
            account,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// `listUsers`.
    fn users(&self, params: &Parameters) -> Result<UsersResponse> {
        let response = self.backend.list_users()?;
        Ok(UsersResponse {
            users: response.data,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// `getSystemId`.
    fn system_id(&self, params: &Parameters) -> Result<SystemIdResponse> {
        let response = self.backend.system_id()?;
        Ok(SystemIdResponse {
            system_id: response.data,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// `getTanMethods`.
    fn tan_methods(&self, params: &Parameters) -> Result<TanMethodsResponse> {
        let response = self.backend.tan_methods()?;
        Ok(TanMethodsResponse {
            tan_methods: response.data,
            timestamp: Utc::now(),
            raw_output: raw_output(params.options, response.raw),
        })
    }

    /// Reported bank code, else the request's, else the configured one.
    fn fallback_bank_code(&self, reported: Option<String>, query: &AccountQuery) -> Option<String> {
        reported
            .filter(|code| !code.trim().is_empty())
            .or_else(|| query.bank_code.clone())
            .or_else(|| self.config.bank_code().map(str::to_owned))
    }

    /// Fills a blank account bank code from the configuration.
    fn with_default_bank_code(&self, mut account: Account) -> Account {
        if account.bank_code.trim().is_empty()
            && let Some(code) = self.config.bank_code()
        {
            code.clone_into(&mut account.bank_code);
        }
        account
    }
}

/// Account identifier of a request that needs one.
fn account_query(params: &Parameters) -> Result<AccountQuery> {
    let account = params
        .account_number
        .as_deref()
        .map(str::trim)
        .filter(|account| !account.is_empty())
        .ok_or_else(|| BankingError::configuration("account number is required"))?;
    Ok(AccountQuery::new(account).with_bank_code(params.bank_code.as_deref()))
}

/// Resolves the requested window against today's date.
fn requested_range(params: &Parameters) -> Result<DateRange> {
    let today = Utc::now().date_naive();
    if params.date_range != DateRangeSelector::Custom {
        return Ok(resolve_date_range(params.date_range, None, None, today));
    }
    let start = parse_optional_date(params.start_date.as_deref())?;
    let end = parse_optional_date(params.end_date.as_deref())?;
    Ok(resolve_date_range(DateRangeSelector::Custom, start, end, today))
}

/// Raw output text if the caller asked for it.
fn raw_output(options: OutputOptions, raw: RawOutput) -> Option<String> {
    options.include_raw_output.then(|| raw.into_text())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::backend::NativeBalance;
    use crate::backend::native::testing::{ScriptedConnector, giro_account};
    use crate::models::NO_RAW_OUTPUT;
    use crate::process::ProcessOutput;
    use crate::process::testing::RecordingRunner;

    fn config() -> BankingConfig {
        BankingConfig::new("37040044", "max")
    }

    fn dispatcher(runner: &Arc<RecordingRunner>) -> Dispatcher {
        let shared: Arc<dyn ProcessRunner> = Arc::<RecordingRunner>::clone(runner);
        Dispatcher::builder()
            .config(config())
            .runner(shared)
            .build()
            .unwrap()
    }

    fn reply(stdout: &str) -> std::io::Result<ProcessOutput> {
        Ok(ProcessOutput {
            stdout: stdout.to_owned(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    fn five_transactions() -> String {
        (1..=5)
            .map(|n| format!("Transaction {n}\n  Amount: -{n},00\n  Purpose: Item {n}\n"))
            .collect()
    }

    #[test]
    fn builder_requires_config() {
        assert!(matches!(
            Dispatcher::builder().build(),
            Err(BankingError::Configuration(_))
        ));
    }

    #[test]
    fn default_backend_is_external_tool() {
        let runner = Arc::new(RecordingRunner::default());
        assert_eq!(dispatcher(&runner).backend_kind(), BackendKind::ExternalTool);
    }

    #[test]
    fn balance_end_to_end() {
        let runner = Arc::new(RecordingRunner::ok("Saldo : 1.234,56 EUR\n"));
        let request = Request::new(Operation::GetBalance).account("12345");
        let output = dispatcher(&runner).execute(&request).unwrap();

        let OperationOutput::Balance(response) = output else {
            panic!("expected a balance record");
        };
        assert!((response.balance.amount - 1234.56).abs() < 1e-9);
        assert_eq!(response.balance.currency, "EUR");
        assert_eq!(response.balance.bank_code.as_deref(), Some("37040044"));
        assert_eq!(response.raw_output, None);

        let value = serde_json::to_value(&response).unwrap();
        assert!((value["balance"].as_f64().unwrap() - 1234.56).abs() < 1e-9);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn request_bank_code_wins_over_configured() {
        let runner = Arc::new(RecordingRunner::ok("Saldo : 5,00 EUR\n"));
        let request = Request::new(Operation::GetBalance).with_params(Parameters {
            account_number: Some("12345".to_owned()),
            bank_code: Some("10020030".to_owned()),
            ..Parameters::default()
        });
        let OperationOutput::Balance(response) = dispatcher(&runner).execute(&request).unwrap()
        else {
            panic!("expected a balance record");
        };
        assert_eq!(response.balance.bank_code.as_deref(), Some("10020030"));
        assert!(runner.calls()[0].args.contains(&"10020030".to_owned()));
    }

    #[test]
    fn blank_account_fails_before_spawning() {
        let runner = Arc::new(RecordingRunner::default());
        let dispatcher = dispatcher(&runner);
        for operation in [
            Operation::GetBalance,
            Operation::GetAccountInfo,
            Operation::GetTransactions,
            Operation::ExportTransactions,
        ] {
            let request = Request::new(operation).account("   ");
            assert!(matches!(
                dispatcher.execute(&request),
                Err(BankingError::Configuration(_))
            ));
            let missing = Request::new(operation);
            assert!(matches!(
                dispatcher.execute(&missing),
                Err(BankingError::Configuration(_))
            ));
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn mismatched_pairing_is_configuration_error() {
        let runner = Arc::new(RecordingRunner::default());
        let request = Request {
            resource: Resource::User,
            ..Request::new(Operation::GetBalance).account("12345")
        };
        let err = dispatcher(&runner).execute(&request).unwrap_err();
        assert!(matches!(err, BankingError::Configuration(_)));
        assert!(err.to_string().contains("getBalance"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        assert!(matches!(
            Request::from_names("account", "deleteAccount"),
            Err(BankingError::Configuration(_))
        ));
        assert!(matches!(
            Request::from_names("portfolio", "getBalance"),
            Err(BankingError::Configuration(_))
        ));
        let request = Request::from_names("transaction", "exportTransactions").unwrap();
        assert_eq!(request.operation, Operation::ExportTransactions);
    }

    #[test]
    fn tool_failure_is_execution_error() {
        let runner = Arc::new(RecordingRunner::failing(3, "auth failed"));
        let request = Request::new(Operation::GetBalance).account("12345");
        let err = dispatcher(&runner).execute(&request).unwrap_err();
        assert!(matches!(err, BankingError::BackendExecution { .. }));
        assert!(err.to_string().contains("auth failed"));
    }

    #[test]
    fn continue_batch_records_failure_in_place() {
        let runner = Arc::new(RecordingRunner::with_replies([
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: "auth failed".to_owned(),
                exit_code: Some(3),
            }),
            reply("Saldo : 5,00 EUR\n"),
        ]));
        let requests = [
            Request::new(Operation::GetBalance).account("1"),
            Request::new(Operation::GetBalance).account("2"),
        ];
        let outputs = dispatcher(&runner)
            .execute_batch(&requests, FailurePolicy::Continue)
            .unwrap();

        assert_eq!(outputs.len(), 2);
        let record = outputs[0].as_error().unwrap();
        assert!(record.error.contains("auth failed"));
        assert_eq!(record.operation, Operation::GetBalance);
        assert_eq!(record.resource, Resource::Account);
        assert!(matches!(outputs[1], OperationOutput::Balance(_)));
    }

    #[test]
    fn abort_batch_returns_first_error() {
        let runner = Arc::new(RecordingRunner::with_replies([
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: "auth failed".to_owned(),
                exit_code: Some(3),
            }),
            reply("Saldo : 5,00 EUR\n"),
        ]));
        let requests = [
            Request::new(Operation::GetBalance).account("1"),
            Request::new(Operation::GetBalance).account("2"),
        ];
        let result = dispatcher(&runner).execute_batch(&requests, FailurePolicy::default());
        assert!(matches!(result, Err(BankingError::BackendExecution { .. })));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn max_results_truncates_and_recounts() {
        let runner = Arc::new(RecordingRunner::ok(&five_transactions()));
        let request = Request::new(Operation::GetTransactions).with_params(Parameters {
            account_number: Some("12345".to_owned()),
            options: OutputOptions {
                max_results: 2,
                include_raw_output: true,
                ..OutputOptions::default()
            },
            ..Parameters::default()
        });
        let OperationOutput::Transactions(response) =
            dispatcher(&runner).execute(&request).unwrap()
        else {
            panic!("expected a transaction listing");
        };
        assert_eq!(response.count, 2);
        assert_eq!(response.transactions.len(), 2);
        assert_eq!(response.transactions[1].purpose, "Item 2");
        assert_eq!(response.account_number, "12345");
        assert_eq!(response.bank_code.as_deref(), Some("37040044"));
        assert!(response.raw_output.unwrap().contains("Item 5"));
    }

    #[test]
    fn default_window_is_last_thirty_days() {
        let runner = Arc::new(RecordingRunner::ok(""));
        let request = Request::new(Operation::GetTransactions).account("12345");
        let OperationOutput::Transactions(response) =
            dispatcher(&runner).execute(&request).unwrap()
        else {
            panic!("expected a transaction listing");
        };
        let (Some(start), Some(end)) = (response.date_range.start_date, response.date_range.end_date)
        else {
            panic!("expected a bounded range");
        };
        assert_eq!((end - start).num_days(), 30);
        assert!(runner.calls()[0].args.contains(&"--fromdate".to_owned()));
    }

    #[test]
    fn custom_window_and_invalid_date() {
        let runner = Arc::new(RecordingRunner::ok(""));
        let dispatcher = dispatcher(&runner);
        let params = Parameters {
            account_number: Some("12345".to_owned()),
            date_range: DateRangeSelector::Custom,
            start_date: Some("2024-03-01".to_owned()),
            end_date: Some("   ".to_owned()),
            ..Parameters::default()
        };
        let request = Request::new(Operation::GetTransactions).with_params(params.clone());
        let OperationOutput::Transactions(response) = dispatcher.execute(&request).unwrap() else {
            panic!("expected a transaction listing");
        };
        assert_eq!(response.date_range.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(response.date_range.end_date, None);
        let args = &runner.calls()[0].args;
        assert!(args.contains(&"20240301".to_owned()));
        assert!(!args.contains(&"--todate".to_owned()));

        let bad = Request::new(Operation::GetTransactions).with_params(Parameters {
            start_date: Some("March".to_owned()),
            ..params
        });
        assert!(matches!(
            dispatcher.execute(&bad),
            Err(BankingError::Configuration(_))
        ));
    }

    #[test]
    fn export_attaches_csv_unless_json() {
        let runner = Arc::new(RecordingRunner::with_replies([
            reply(&five_transactions()),
            reply(&five_transactions()),
        ]));
        let dispatcher = dispatcher(&runner);
        let request = Request::new(Operation::ExportTransactions).account("12345");

        let OperationOutput::Export(csv) = dispatcher.execute(&request).unwrap() else {
            panic!("expected an export record");
        };
        assert_eq!(csv.format, OutputFormat::Csv);
        let data = csv.csv_data.unwrap();
        assert!(data.starts_with(&crate::export::CSV_HEADER.join(",")));
        assert_eq!(data.lines().count(), 6);

        let json_request = Request::new(Operation::ExportTransactions).with_params(Parameters {
            account_number: Some("12345".to_owned()),
            options: OutputOptions {
                output_format: OutputFormat::Json,
                ..OutputOptions::default()
            },
            ..Parameters::default()
        });
        let OperationOutput::Export(json) = dispatcher.execute(&json_request).unwrap() else {
            panic!("expected an export record");
        };
        assert_eq!(json.format, OutputFormat::Json);
        assert_eq!(json.csv_data, None);
        assert_eq!(json.listing.count, 5);
    }

    #[test]
    fn account_info_matches_iban_or_reports_available() {
        let listing = "Account 1\n  Number: 42\n  IBAN: DE02120300000000202051\n";
        let runner = Arc::new(RecordingRunner::with_replies([reply(listing), reply(listing)]));
        let dispatcher = dispatcher(&runner);

        let found = Request::new(Operation::GetAccountInfo).account("DE02 1203 0000 0000 2020 51");
        let OperationOutput::AccountInfo(info) = dispatcher.execute(&found).unwrap() else {
            panic!("expected an account record");
        };
        assert_eq!(info.account.account_number, "42");
        assert_eq!(info.account.bank_code, "37040044");

        let missing = Request::new(Operation::GetAccountInfo).account("999");
        match dispatcher.execute(&missing).unwrap_err() {
            BankingError::NotFound { account, available } => {
                assert_eq!(account, "999");
                assert_eq!(available, vec!["DE02120300000000202051".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn native_raw_output_placeholder() {
        let connector = Arc::new(ScriptedConnector {
            accounts: vec![giro_account()],
            balance: Some(NativeBalance {
                amount: 99.5,
                currency: Some("EUR".to_owned()),
                date: None,
            }),
            ..ScriptedConnector::default()
        });
        let shared: Arc<dyn FintsConnector> = connector;
        let dispatcher = Dispatcher::builder()
            .config(BankingConfig {
                backend: BackendKind::Native,
                ..config()
            })
            .connector(shared)
            .build()
            .unwrap();
        assert_eq!(dispatcher.backend_kind(), BackendKind::Native);

        let request = Request::new(Operation::GetBalance).with_params(Parameters {
            account_number: Some("0532013000".to_owned()),
            options: OutputOptions {
                include_raw_output: true,
                ..OutputOptions::default()
            },
            ..Parameters::default()
        });
        let OperationOutput::Balance(response) = dispatcher.execute(&request).unwrap() else {
            panic!("expected a balance record");
        };
        assert!((response.balance.amount - 99.5).abs() < f64::EPSILON);
        assert_eq!(response.raw_output.as_deref(), Some(NO_RAW_OUTPUT));
    }

    #[test]
    fn admin_operations() {
        let runner = Arc::new(RecordingRunner::with_replies([
            reply("User 1\n  Id: max\n  Name: Max\n  Bank: 37040044\n"),
            reply("System ID: 1234567890ABCDEF\n"),
            reply("- 942: pushTAN\n"),
        ]));
        let dispatcher = dispatcher(&runner);
        let OperationOutput::Users(users) =
            dispatcher.execute(&Request::new(Operation::ListUsers)).unwrap()
        else {
            panic!("expected a user list");
        };
        assert_eq!(users.users.len(), 1);
        assert!(matches!(
            dispatcher.execute(&Request::new(Operation::GetSystemId)),
            Ok(OperationOutput::SystemId(_))
        ));
        assert!(matches!(
            dispatcher.execute(&Request::new(Operation::GetTanMethods)),
            Ok(OperationOutput::TanMethods(_))
        ));
    }

    #[test]
    fn request_deserializes_from_json() {
        let request: Request = serde_json::from_str(
            r#"{"resource": "transaction", "operation": "getTransactions",
                "params": {"accountNumber": "12345", "dateRange": "all",
                           "options": {"maxResults": 10}}}"#,
        )
        .unwrap();
        assert_eq!(request.operation, Operation::GetTransactions);
        assert_eq!(request.params.date_range, DateRangeSelector::All);
        assert_eq!(request.params.options.max_results, 10);
        assert_eq!(request.params.options.output_format, OutputFormat::Csv);
    }
}
