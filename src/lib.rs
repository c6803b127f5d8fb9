//! Normalized FinTS/HBCI banking data on top of `AqBanking`.
//!
//! The crate turns the output of several ways of talking to a German bank
//! (the `aqbanking-cli` / `aqhbci-tool4` tools, the same tools inside a
//! Docker container, a python-fints bridge script, or an injected
//! in-process client) into one set of canonical records: balances,
//! transactions, accounts, users, system ids and TAN methods.
//!
//! ```no_run
//! use aqbanking_rs::config::BankingConfig;
//! use aqbanking_rs::dispatcher::{Dispatcher, Request};
//! use aqbanking_rs::models::Operation;
//!
//! # fn main() -> aqbanking_rs::error::Result<()> {
//! let dispatcher = Dispatcher::new(BankingConfig::from_env()?)?;
//! let output = dispatcher.execute(&Request::new(Operation::GetBalance).account("1234567890"))?;
//! println!("{}", output.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod process;
