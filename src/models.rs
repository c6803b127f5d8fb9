//! Data models for normalized banking records.
//!
//! This module contains the canonical records every backend produces
//! (balances, transactions, accounts, users, TAN methods), the response
//! wrappers the dispatcher returns, and enumeration types for constrained
//! request values.

mod account;
mod balance;
mod date_range;
mod enums;
mod responses;
mod transaction;
mod user;

pub use account::{Account, matches_account};
pub use balance::Balance;
pub use chrono::NaiveDate;
pub use date_range::{COMPACT_DATE_FORMAT, DateRange};
pub use enums::{BackendKind, DateRangeSelector, Operation, OutputFormat, RecordKind, Resource};
pub use responses::{
    AccountInfoResponse, AccountsResponse, BalanceResponse, ErrorRecord, ExportResponse,
    NO_RAW_OUTPUT, OperationOutput, RawOutput, SystemIdResponse, TanMethodsResponse,
    TransactionsResponse, UsersResponse,
};
pub use transaction::{DEFAULT_CURRENCY, Transaction};
pub use user::{TanMethod, User};
