//! Enumeration types for constrained request and backend values.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Execution backend used to talk to the bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// In-process FinTS client behind [`crate::backend::FintsConnector`].
    #[serde(rename = "native")]
    Native,
    /// `aqbanking-cli` / `aqhbci-tool4` on the host.
    #[default]
    #[serde(rename = "system", alias = "externalTool")]
    ExternalTool,
    /// A python-fints script run through the configured interpreter.
    #[serde(rename = "python", alias = "script")]
    Script,
    /// The AqBanking tools inside an ephemeral Docker container.
    #[serde(rename = "docker", alias = "container")]
    Container,
}

impl BackendKind {
    /// Stable lower-case name used in logs and error messages.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::ExternalTool => "external-tool",
            Self::Script => "script",
            Self::Container => "container",
        }
    }
}

impl fmt::Display for BackendKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "system" | "external-tool" | "externaltool" | "cli" => Ok(Self::ExternalTool),
            "python" | "script" => Ok(Self::Script),
            "docker" | "container" => Ok(Self::Container),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Record kind a parser produces, used to label parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    /// Account balance line.
    Balance,
    /// Transaction block.
    Transaction,
    /// Account block.
    Account,
    /// User block.
    User,
    /// System identifier line.
    SystemId,
    /// TAN method line.
    TanMethod,
}

impl fmt::Display for RecordKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Balance => "balance",
            Self::Transaction => "transaction",
            Self::Account => "account",
            Self::User => "user",
            Self::SystemId => "system id",
            Self::TanMethod => "TAN method",
        })
    }
}

/// Resource half of a dispatcher request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    /// Balances and account listings.
    #[default]
    Account,
    /// Transaction history and export.
    Transaction,
    /// User management queries.
    User,
}

impl FromStr for Resource {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "account" => Ok(Self::Account),
            "transaction" => Ok(Self::Transaction),
            "user" => Ok(Self::User),
            other => Err(format!("unknown resource: {other}")),
        }
    }
}

impl fmt::Display for Resource {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Account => "account",
            Self::Transaction => "transaction",
            Self::User => "user",
        })
    }
}

/// Operation half of a dispatcher request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Current balance of one account.
    GetBalance,
    /// All accounts known to the backend.
    ListAccounts,
    /// Details of one account.
    GetAccountInfo,
    /// Transactions of one account.
    GetTransactions,
    /// Transactions of one account, shaped for export.
    ExportTransactions,
    /// Users configured in the backend.
    ListUsers,
    /// FinTS system identifier.
    GetSystemId,
    /// TAN methods offered by the bank.
    GetTanMethods,
}

impl Operation {
    /// Resource this operation belongs to.
    #[inline]
    #[must_use]
    pub const fn resource(self) -> Resource {
        match self {
            Self::GetBalance | Self::ListAccounts | Self::GetAccountInfo => Resource::Account,
            Self::GetTransactions | Self::ExportTransactions => Resource::Transaction,
            Self::ListUsers | Self::GetSystemId | Self::GetTanMethods => Resource::User,
        }
    }

    /// Wire name (`getBalance`, `listAccounts`, ...).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetBalance => "getBalance",
            Self::ListAccounts => "listAccounts",
            Self::GetAccountInfo => "getAccountInfo",
            Self::GetTransactions => "getTransactions",
            Self::ExportTransactions => "exportTransactions",
            Self::ListUsers => "listUsers",
            Self::GetSystemId => "getSystemId",
            Self::GetTanMethods => "getTanMethods",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    /// Parses the camelCase operation name used on the wire.
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "getBalance" => Ok(Self::GetBalance),
            "listAccounts" => Ok(Self::ListAccounts),
            "getAccountInfo" => Ok(Self::GetAccountInfo),
            "getTransactions" => Ok(Self::GetTransactions),
            "exportTransactions" => Ok(Self::ExportTransactions),
            "listUsers" => Ok(Self::ListUsers),
            "getSystemId" => Ok(Self::GetSystemId),
            "getTanMethods" => Ok(Self::GetTanMethods),
            other => Err(format!("unknown operation: {other}")),
        }
    }
}

impl fmt::Display for Operation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export format for `exportTransactions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Attach a CSV rendering of the transactions.
    #[default]
    Csv,
    /// Pass the JSON record through unchanged.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Symbolic date range selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateRangeSelector {
    /// No date filtering.
    All,
    /// Today minus 30 days through today.
    #[default]
    #[serde(rename = "last30Days")]
    Last30Days,
    /// Today minus 90 days through today.
    #[serde(rename = "last90Days")]
    Last90Days,
    /// Caller-supplied bounds.
    Custom,
}

impl FromStr for DateRangeSelector {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "last30days" | "30d" => Ok(Self::Last30Days),
            "last90days" | "90d" => Ok(Self::Last90Days),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown date range: {other}")),
        }
    }
}
