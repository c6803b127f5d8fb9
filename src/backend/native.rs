//! Backend over an in-process FinTS client.
//!
//! The protocol client itself lives outside this crate. It is plugged in
//! through [`FintsConnector`], which opens a [`FintsSession`] per call.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::{AccountQuery, Backend, BackendResponse, TransactionListing, TransactionQuery};
use crate::config::BankingConfig;
use crate::error::{BankingError, Result};
use crate::models::{
    Account, BackendKind, Balance, DEFAULT_CURRENCY, Operation, TanMethod, Transaction, User,
    matches_account,
};

/// Error type reported by connector implementations.
pub type SessionError = Box<dyn core::error::Error + Send + Sync>;

/// An account as the native client reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeAccount {
    /// National account number.
    pub account_number: String,
    /// IBAN.
    pub iban: Option<String>,
    /// BIC.
    pub bic: Option<String>,
    /// Bank code.
    pub bank_code: Option<String>,
    /// Holder name.
    pub name: Option<String>,
    /// Bank name.
    pub bank_name: Option<String>,
    /// Account type.
    pub account_type: Option<String>,
}

impl NativeAccount {
    /// Returns `true` if `identifier` names this account.
    #[inline]
    #[must_use]
    pub fn matches(&self, identifier: &str) -> bool {
        matches_account(&self.account_number, self.iban.as_deref().unwrap_or_default(), identifier)
    }

    /// The IBAN when known, else the account number.
    fn display_id(&self) -> &str {
        self.iban
            .as_deref()
            .filter(|iban| !iban.is_empty())
            .unwrap_or(&self.account_number)
    }
}

impl From<NativeAccount> for Account {
    #[inline]
    fn from(account: NativeAccount) -> Self {
        Self {
            account_number: account.account_number,
            iban: account.iban.unwrap_or_default(),
            bic: account.bic.unwrap_or_default(),
            bank_code: account.bank_code.unwrap_or_default(),
            account_name: account.name.unwrap_or_default(),
            bank_name: account.bank_name.unwrap_or_default(),
            account_type: account.account_type.unwrap_or_default(),
        }
    }
}

/// A balance as the native client reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeBalance {
    /// Amount.
    pub amount: f64,
    /// Currency, if reported.
    pub currency: Option<String>,
    /// Balance date, if reported.
    pub date: Option<DateTime<Utc>>,
}

/// A transaction as the native client reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeTransaction {
    /// Signed amount.
    pub amount: f64,
    /// Currency, if reported.
    pub currency: Option<String>,
    /// Booking date.
    pub date: Option<NaiveDate>,
    /// Value date.
    pub valuta_date: Option<NaiveDate>,
    /// Counterparty name.
    pub remote_name: Option<String>,
    /// Structured purpose.
    pub purpose: Option<String>,
    /// Free-form transaction text, used when no purpose is present.
    pub text: Option<String>,
    /// Counterparty IBAN.
    pub remote_iban: Option<String>,
    /// Counterparty BIC.
    pub remote_bic: Option<String>,
    /// Transaction code.
    pub transaction_code: Option<String>,
    /// End-to-end reference.
    pub reference: Option<String>,
    /// Booking text (`Buchungstext`).
    pub booking_text: Option<String>,
    /// Primanota number.
    pub prima_nota_number: Option<String>,
}

impl From<NativeTransaction> for Transaction {
    fn from(tx: NativeTransaction) -> Self {
        let iso = |date: Option<NaiveDate>| {
            date.map(|day| day.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        Self {
            amount: tx.amount,
            currency: tx.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            date: iso(tx.date),
            valuta_date: iso(tx.valuta_date),
            remote_name: tx.remote_name.unwrap_or_default(),
            purpose: tx.purpose.or(tx.text).unwrap_or_default(),
            remote_iban: tx.remote_iban.unwrap_or_default(),
            remote_bic: tx.remote_bic.unwrap_or_default(),
            transaction_code: tx.transaction_code.unwrap_or_default(),
            reference: tx.reference.unwrap_or_default(),
            booking_text: tx.booking_text.unwrap_or_default(),
            prima_nota_number: tx.prima_nota_number.unwrap_or_default(),
        }
    }
}

/// Opens sessions with the bank.
pub trait FintsConnector: core::fmt::Debug + Send + Sync {
    /// Logs in with the credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns the client's error if the dialog cannot be opened.
    fn connect(&self, config: &BankingConfig) -> core::result::Result<Box<dyn FintsSession>, SessionError>;
}

/// An open dialog with the bank.
pub trait FintsSession: core::fmt::Debug + Send {
    /// Lists SEPA accounts.
    ///
    /// # Errors
    ///
    /// Returns the client's error.
    fn accounts(&mut self) -> core::result::Result<Vec<NativeAccount>, SessionError>;

    /// Fetches the balance of `account`.
    ///
    /// # Errors
    ///
    /// Returns the client's error.
    fn balance(&mut self, account: &NativeAccount) -> core::result::Result<NativeBalance, SessionError>;

    /// Fetches transactions of `account` within the optional bounds.
    ///
    /// # Errors
    ///
    /// Returns the client's error.
    fn transactions(
        &mut self,
        account: &NativeAccount,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> core::result::Result<Vec<NativeTransaction>, SessionError>;

    /// Ends the dialog.
    ///
    /// # Errors
    ///
    /// Returns the client's error; callers ignore it.
    fn close(&mut self) -> core::result::Result<(), SessionError>;
}

/// Closes the wrapped session when dropped.
#[derive(Debug)]
struct SessionGuard {
    /// Open session.
    session: Box<dyn FintsSession>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(err) = self.session.close() {
            tracing::debug!(error = %err, "ignoring session close failure");
        }
    }
}

/// Wraps a client error for the native backend.
fn execution(context: &str, err: &SessionError) -> BankingError {
    BankingError::BackendExecution {
        backend: BackendKind::Native,
        message: format!("{context}: {err}"),
    }
}

/// Backend over an injected [`FintsConnector`].
#[derive(Debug)]
pub struct NativeBackend {
    /// Shared settings.
    config: Arc<BankingConfig>,
    /// Client entry point; absent when no native client is installed.
    connector: Option<Arc<dyn FintsConnector>>,
}

impl NativeBackend {
    /// Creates the backend.
    #[inline]
    #[must_use]
    pub const fn new(config: Arc<BankingConfig>, connector: Option<Arc<dyn FintsConnector>>) -> Self {
        Self { config, connector }
    }

    /// Opens a session guarded against leaks.
    fn open(&self) -> Result<SessionGuard> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| BankingError::BackendUnavailable {
                backend: BackendKind::Native,
                reason: "no native FinTS client is installed".to_owned(),
            })?;
        self.config.require_login()?;
        let session = connector
            .connect(&self.config)
            .map_err(|err| execution("failed to open FinTS dialog", &err))?;
        tracing::debug!("native session opened");
        Ok(SessionGuard { session })
    }

    /// Finds the account named by `identifier`.
    fn find_account(guard: &mut SessionGuard, identifier: &str) -> Result<NativeAccount> {
        let accounts = guard
            .session
            .accounts()
            .map_err(|err| execution("failed to list accounts", &err))?;
        let available: Vec<String> = accounts
            .iter()
            .map(|account| account.display_id().to_owned())
            .collect();
        accounts
            .into_iter()
            .find(|account| account.matches(identifier))
            .ok_or_else(|| BankingError::NotFound {
                account: identifier.to_owned(),
                available,
            })
    }

    /// Error for operations the native client does not offer.
    fn unsupported<T>(operation: Operation) -> Result<T> {
        Err(BankingError::BackendUnavailable {
            backend: BackendKind::Native,
            reason: format!("`{operation}` is not offered by the native client"),
        })
    }
}

impl Backend for NativeBackend {
    #[inline]
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    #[tracing::instrument(skip_all, fields(backend = "native"))]
    fn balance(&self, query: &AccountQuery) -> Result<BackendResponse<Balance>> {
        let mut guard = self.open()?;
        let account = Self::find_account(&mut guard, &query.account)?;
        let reported = guard
            .session
            .balance(&account)
            .map_err(|err| execution("failed to get balance", &err))?;

        let balance = Balance {
            amount: reported.amount,
            currency: reported
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            account_number: account.account_number,
            iban: account.iban,
            bank_code: account.bank_code,
            account_name: account.name,
            date: Some(reported.date.unwrap_or_else(Utc::now)),
        };
        Ok(BackendResponse::without_output(balance))
    }

    #[tracing::instrument(skip_all, fields(backend = "native"))]
    fn transactions(&self, query: &TransactionQuery) -> Result<BackendResponse<TransactionListing>> {
        let mut guard = self.open()?;
        let account = Self::find_account(&mut guard, &query.account.account)?;
        let reported = guard
            .session
            .transactions(
                &account,
                query.date_range.start_date,
                query.date_range.end_date,
            )
            .map_err(|err| execution("failed to get transactions", &err))?;

        let listing = TransactionListing {
            transactions: reported.into_iter().map(Transaction::from).collect(),
            account_number: account.account_number,
            iban: account.iban,
            bank_code: account.bank_code,
        };
        tracing::debug!(count = listing.transactions.len(), "transactions fetched");
        Ok(BackendResponse::without_output(listing))
    }

    #[tracing::instrument(skip_all, fields(backend = "native"))]
    fn list_accounts(&self) -> Result<BackendResponse<Vec<Account>>> {
        let mut guard = self.open()?;
        let accounts = guard
            .session
            .accounts()
            .map_err(|err| execution("failed to list accounts", &err))?;
        Ok(BackendResponse::without_output(
            accounts.into_iter().map(Account::from).collect(),
        ))
    }

    fn list_users(&self) -> Result<BackendResponse<Vec<User>>> {
        Self::unsupported(Operation::ListUsers)
    }

    fn system_id(&self) -> Result<BackendResponse<String>> {
        Self::unsupported(Operation::GetSystemId)
    }

    fn tan_methods(&self) -> Result<BackendResponse<Vec<TanMethod>>> {
        Self::unsupported(Operation::GetTanMethods)
    }
}
