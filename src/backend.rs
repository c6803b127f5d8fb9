//! Execution backends.
//!
//! Every way of reaching the bank implements [`Backend`]. The variants
//! differ in how they obtain data (in-process client, host tools, an
//! interpreter script, or the tools inside a container) but all return the
//! canonical models plus the raw output they parsed. [`create_backend`] is
//! the only place that chooses between them.

pub mod native;
pub mod script;
pub mod tool;

use std::sync::Arc;

pub use native::{
    FintsConnector, FintsSession, NativeAccount, NativeBackend, NativeBalance, NativeTransaction,
    SessionError,
};
pub use script::ScriptBackend;
#[cfg(feature = "container")]
pub use tool::ContainerLauncher;
pub use tool::{DirectLauncher, Launcher, Tool, ToolBackend, ToolCall};

use crate::config::BankingConfig;
use crate::error::Result;
use crate::models::{Account, BackendKind, Balance, DateRange, RawOutput, TanMethod, Transaction, User};
use crate::process::ProcessRunner;

/// Identifies the account a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    /// Account number or IBAN.
    pub account: String,
    /// Bank code supplied with the request, if any.
    pub bank_code: Option<String>,
}

impl AccountQuery {
    /// Query for `account` without an explicit bank code.
    #[inline]
    #[must_use]
    pub fn new<A: Into<String>>(account: A) -> Self {
        Self {
            account: account.into(),
            bank_code: None,
        }
    }

    /// Sets the request bank code; blank codes are ignored.
    #[inline]
    #[must_use]
    pub fn with_bank_code(mut self, bank_code: Option<&str>) -> Self {
        self.bank_code = bank_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_owned);
        self
    }
}

/// Transaction listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Target account.
    pub account: AccountQuery,
    /// Date bounds passed to the bank.
    pub date_range: DateRange,
}

/// Transactions of one account as returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionListing {
    /// Transactions in backend order.
    pub transactions: Vec<Transaction>,
    /// Account number as reported (or as requested).
    pub account_number: String,
    /// IBAN, when reported.
    pub iban: Option<String>,
    /// Bank code, when reported.
    pub bank_code: Option<String>,
}

/// Backend result together with the output it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse<T> {
    /// Parsed data.
    pub data: T,
    /// Raw backend output.
    pub raw: RawOutput,
}

impl<T> BackendResponse<T> {
    /// Response parsed from captured text.
    #[inline]
    #[must_use]
    pub const fn captured(data: T, raw: String) -> Self {
        Self {
            data,
            raw: RawOutput::Captured(raw),
        }
    }

    /// Response without textual output.
    #[inline]
    #[must_use]
    pub const fn without_output(data: T) -> Self {
        Self {
            data,
            raw: RawOutput::Unavailable,
        }
    }

    /// Transforms the data, keeping the raw output.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> BackendResponse<U> {
        BackendResponse {
            data: f(self.data),
            raw: self.raw,
        }
    }
}

/// A way of executing banking operations.
///
/// Each call is self-contained: the backend opens whatever session or
/// process it needs and releases it before returning, on success and on
/// error.
pub trait Backend: core::fmt::Debug + Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> BackendKind;

    /// Fetches the balance of one account.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached, reports an error, or its
    /// output contains no balance.
    fn balance(&self, query: &AccountQuery) -> Result<BackendResponse<Balance>>;

    /// Lists transactions of one account.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or reports an error.
    fn transactions(&self, query: &TransactionQuery) -> Result<BackendResponse<TransactionListing>>;

    /// Lists the accounts known to the backend.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached or reports an error.
    fn list_accounts(&self) -> Result<BackendResponse<Vec<Account>>>;

    /// Lists the users configured in the backend.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached, reports an error, or does
    /// not offer this operation.
    fn list_users(&self) -> Result<BackendResponse<Vec<User>>>;

    /// Retrieves the FinTS system id.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached, reports an error, does not
    /// offer this operation, or prints no system id.
    fn system_id(&self) -> Result<BackendResponse<String>>;

    /// Lists the TAN methods the bank offers.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be reached, reports an error, or does
    /// not offer this operation.
    fn tan_methods(&self) -> Result<BackendResponse<Vec<TanMethod>>>;
}

/// Builds the backend selected by `config.backend`.
///
/// `connector` is only consulted for [`BackendKind::Native`]; without it
/// the native backend reports itself unavailable on every call.
///
/// # Errors
///
/// Returns [`crate::error::BankingError::BackendUnavailable`] if the
/// container backend is selected but the crate was built without the
/// `container` feature, or if the container configuration directory
/// cannot be determined.
pub fn create_backend(
    config: Arc<BankingConfig>,
    runner: Arc<dyn ProcessRunner>,
    connector: Option<Arc<dyn FintsConnector>>,
) -> Result<Box<dyn Backend>> {
    tracing::debug!(backend = %config.backend, "selecting backend");
    Ok(match config.backend {
        BackendKind::Native => Box::new(NativeBackend::new(config, connector)),
        BackendKind::ExternalTool => {
            let launcher = DirectLauncher::from_config(&config);
            Box::new(ToolBackend::new(config, runner, launcher))
        }
        BackendKind::Script => Box::new(ScriptBackend::new(config, runner)),
        BackendKind::Container => container_backend(config, runner)?,
    })
}

/// Containerized tool backend.
#[cfg(feature = "container")]
fn container_backend(
    config: Arc<BankingConfig>,
    runner: Arc<dyn ProcessRunner>,
) -> Result<Box<dyn Backend>> {
    let launcher = ContainerLauncher::from_config(&config)?;
    Ok(Box::new(ToolBackend::new(config, runner, launcher)))
}

/// Containerized tool backend (not compiled in).
#[cfg(not(feature = "container"))]
fn container_backend(
    _config: Arc<BankingConfig>,
    _runner: Arc<dyn ProcessRunner>,
) -> Result<Box<dyn Backend>> {
    Err(crate::error::BankingError::BackendUnavailable {
        backend: BackendKind::Container,
        reason: "built without the `container` feature".to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;

    fn build(kind: BackendKind) -> Box<dyn Backend> {
        let config = BankingConfig {
            backend: kind,
            config_dir: Some("/tmp/aqbanking-config".into()),
            ..BankingConfig::new("37040044", "max")
        };
        create_backend(Arc::new(config), Arc::new(RecordingRunner::default()), None).unwrap()
    }

    #[test]
    fn factory_selects_variant() {
        assert_eq!(build(BackendKind::Native).kind(), BackendKind::Native);
        assert_eq!(build(BackendKind::ExternalTool).kind(), BackendKind::ExternalTool);
        assert_eq!(build(BackendKind::Script).kind(), BackendKind::Script);
    }

    #[cfg(feature = "container")]
    #[test]
    fn factory_selects_container() {
        assert_eq!(build(BackendKind::Container).kind(), BackendKind::Container);
    }

    #[test]
    fn blank_request_bank_code_is_dropped() {
        let query = AccountQuery::new("12345").with_bank_code(Some("  "));
        assert_eq!(query.bank_code, None);
        let query = AccountQuery::new("12345").with_bank_code(Some("37040044"));
        assert_eq!(query.bank_code.as_deref(), Some("37040044"));
    }

    #[test]
    fn response_map_keeps_raw() {
        let response = BackendResponse::captured(2_u32, "two".to_owned()).map(|n| n * 2);
        assert_eq!(response.data, 4);
        assert_eq!(response.raw, RawOutput::Captured("two".to_owned()));
    }
}
