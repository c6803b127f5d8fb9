//! Backends driving the AqBanking command-line tools.
//!
//! The host and container variants build identical tool arguments and
//! parse identical output; they differ only in how the process is
//! launched, which is abstracted by [`Launcher`].

#[cfg(feature = "container")]
use std::path::PathBuf;
use std::sync::Arc;

use secrecy::{ExposeSecret as _, SecretString};

use super::{AccountQuery, Backend, BackendResponse, TransactionListing, TransactionQuery};
use crate::config::{BankingConfig, DEFAULT_AQBANKING_CLI, DEFAULT_HBCI_TOOL};
use crate::error::Result;
use crate::models::{Account, BackendKind, Balance, TanMethod, User};
use crate::parser::{
    parse_accounts, parse_balance, parse_system_id, parse_tan_methods, parse_transactions,
    parse_users,
};
use crate::process::{Invocation, ProcessRunner, run_checked};

/// Mount point of the tool configuration inside the container.
#[cfg(feature = "container")]
const CONTAINER_CONFIG_DIR: &str = "/root/.aqbanking";

/// The two AqBanking programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `aqbanking-cli`: balance and transaction requests.
    AqBankingCli,
    /// `aqhbci-tool4`: account, user, system id and TAN administration.
    HbciTool,
}

impl Tool {
    /// Program name as installed by AqBanking.
    #[inline]
    #[must_use]
    pub const fn program_name(self) -> &'static str {
        match self {
            Self::AqBankingCli => DEFAULT_AQBANKING_CLI,
            Self::HbciTool => DEFAULT_HBCI_TOOL,
        }
    }
}

/// One tool run, before it is bound to a launch mechanism.
#[derive(Debug)]
pub struct ToolCall {
    /// Program to run.
    pub tool: Tool,
    /// Tool arguments.
    pub args: Vec<String>,
    /// Environment for the tool.
    pub env: Vec<(&'static str, &'static str)>,
    /// Standard-input payload (the PIN line).
    pub stdin: Option<SecretString>,
}

/// Turns a [`ToolCall`] into a concrete process invocation.
pub trait Launcher: core::fmt::Debug + Send + Sync {
    /// Backend kind reported in errors.
    fn kind(&self) -> BackendKind;

    /// Builds the invocation for `call`.
    fn launch(&self, call: ToolCall) -> Invocation;
}

/// Runs the tools installed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLauncher {
    /// Path of `aqbanking-cli`.
    aqbanking_cli: String,
    /// Path of `aqhbci-tool4`.
    hbci_tool: String,
}

impl DirectLauncher {
    /// Uses the tool paths from `config`.
    #[inline]
    #[must_use]
    pub fn from_config(config: &BankingConfig) -> Self {
        Self {
            aqbanking_cli: config.aqbanking_cli.clone(),
            hbci_tool: config.hbci_tool.clone(),
        }
    }
}

impl Launcher for DirectLauncher {
    #[inline]
    fn kind(&self) -> BackendKind {
        BackendKind::ExternalTool
    }

    fn launch(&self, call: ToolCall) -> Invocation {
        let program = match call.tool {
            Tool::AqBankingCli => &self.aqbanking_cli,
            Tool::HbciTool => &self.hbci_tool,
        };
        let mut invocation = Invocation::new(program.as_str()).args(call.args);
        for (key, value) in call.env {
            invocation = invocation.env(key, value);
        }
        if let Some(payload) = call.stdin {
            invocation = invocation.stdin(payload);
        }
        invocation
    }
}

/// Runs the tools inside a throw-away container.
///
/// The host configuration directory is mounted at `/root/.aqbanking` so
/// the container sees the same users and accounts as the host tools.
#[cfg(feature = "container")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLauncher {
    /// Container runtime command.
    command: String,
    /// Image containing the tools.
    image: String,
    /// Host directory mounted as the tool configuration.
    config_dir: PathBuf,
}

#[cfg(feature = "container")]
impl ContainerLauncher {
    /// Uses the runtime, image and configuration directory from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BankingError::BackendUnavailable`] if no
    /// configuration directory is set and the home directory is unknown.
    pub fn from_config(config: &BankingConfig) -> Result<Self> {
        let config_dir = match config.config_dir.clone() {
            Some(dir) => dir,
            None => dirs::home_dir()
                .map(|home| home.join(".aqbanking"))
                .ok_or_else(|| crate::error::BankingError::BackendUnavailable {
                    backend: BackendKind::Container,
                    reason: "cannot determine the home directory for the configuration mount"
                        .to_owned(),
                })?,
        };
        Ok(Self {
            command: config.docker_command.clone(),
            image: config.docker_image.clone(),
            config_dir,
        })
    }
}

#[cfg(feature = "container")]
impl Launcher for ContainerLauncher {
    #[inline]
    fn kind(&self) -> BackendKind {
        BackendKind::Container
    }

    fn launch(&self, call: ToolCall) -> Invocation {
        let mut invocation = Invocation::new(self.command.as_str()).args(["run", "--rm"]);
        if call.stdin.is_some() {
            invocation = invocation.arg("-i");
        }
        invocation = invocation.args([
            "-v".to_owned(),
            format!("{}:{CONTAINER_CONFIG_DIR}", self.config_dir.display()),
        ]);
        for (key, value) in call.env {
            invocation = invocation.args(["-e".to_owned(), format!("{key}={value}")]);
        }
        invocation = invocation
            .arg(self.image.as_str())
            .arg(call.tool.program_name())
            .args(call.args);
        if let Some(payload) = call.stdin {
            invocation = invocation.stdin(payload);
        }
        invocation
    }
}

/// Tool-driven backend, generic over how the tools are launched.
#[derive(Debug)]
pub struct ToolBackend<L> {
    /// Shared settings.
    config: Arc<BankingConfig>,
    /// Process runner.
    runner: Arc<dyn ProcessRunner>,
    /// Launch mechanism.
    launcher: L,
}

impl<L: Launcher> ToolBackend<L> {
    /// Creates the backend.
    #[inline]
    #[must_use]
    pub fn new(config: Arc<BankingConfig>, runner: Arc<dyn ProcessRunner>, launcher: L) -> Self {
        Self {
            config,
            runner,
            launcher,
        }
    }

    /// PIN line for stdin, only when the tools run interactively.
    fn pin_line(&self) -> Option<SecretString> {
        if self.config.non_interactive {
            return None;
        }
        self.config
            .pin
            .as_ref()
            .map(|pin| SecretString::from(format!("{}\n", pin.expose_secret())))
    }

    /// Runs one tool and returns its standard output.
    fn run(&self, tool: Tool, args: Vec<String>) -> Result<String> {
        let call = ToolCall {
            tool,
            args,
            env: self.config.debug_env(),
            stdin: self.pin_line(),
        };
        let invocation = self.launcher.launch(call);
        run_checked(self.runner.as_ref(), self.launcher.kind(), &invocation)
    }
}

/// `--noninteractive` and `--url`, shared by the request commands.
fn base_args(config: &BankingConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.non_interactive {
        args.push("--noninteractive".to_owned());
    }
    if let Some(url) = server_url(config) {
        args.extend(["--url".to_owned(), url.to_owned()]);
    }
    args
}

/// `-u` and `--url`, shared by the HBCI administration commands.
fn hbci_args(config: &BankingConfig) -> Vec<String> {
    let mut args = Vec::new();
    if !config.user_id.trim().is_empty() {
        args.extend(["-u".to_owned(), config.user_id.clone()]);
    }
    if let Some(url) = server_url(config) {
        args.extend(["--url".to_owned(), url.to_owned()]);
    }
    args
}

/// Non-blank server URL.
fn server_url(config: &BankingConfig) -> Option<&str> {
    config
        .server_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

/// `-b <bank>` (when given) and `-a <account>`.
fn account_args(query: &AccountQuery) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(bank_code) = query.bank_code.as_ref() {
        args.extend(["-b".to_owned(), bank_code.clone()]);
    }
    args.extend(["-a".to_owned(), query.account.clone()]);
    args
}

/// Arguments of `aqbanking-cli request --balance`.
fn balance_args(config: &BankingConfig, query: &AccountQuery) -> Vec<String> {
    let mut args = base_args(config);
    args.extend(["request".to_owned(), "--balance".to_owned()]);
    args.extend(account_args(query));
    args
}

/// Arguments of `aqbanking-cli request --transactions`.
fn transactions_args(config: &BankingConfig, query: &TransactionQuery) -> Vec<String> {
    let mut args = base_args(config);
    args.extend(["request".to_owned(), "--transactions".to_owned()]);
    args.extend(account_args(&query.account));
    if let Some(start) = query.date_range.compact_start() {
        args.extend(["--fromdate".to_owned(), start]);
    }
    if let Some(end) = query.date_range.compact_end() {
        args.extend(["--todate".to_owned(), end]);
    }
    args
}

impl<L: Launcher> Backend for ToolBackend<L> {
    #[inline]
    fn kind(&self) -> BackendKind {
        self.launcher.kind()
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn balance(&self, query: &AccountQuery) -> Result<BackendResponse<Balance>> {
        let output = self.run(Tool::AqBankingCli, balance_args(&self.config, query))?;
        let parsed = parse_balance(&output)?;
        let balance = Balance {
            bank_code: query.bank_code.clone(),
            ..Balance::new(parsed.amount, parsed.currency, query.account.as_str())
        };
        Ok(BackendResponse::captured(balance, output))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn transactions(&self, query: &TransactionQuery) -> Result<BackendResponse<TransactionListing>> {
        let output = self.run(Tool::AqBankingCli, transactions_args(&self.config, query))?;
        let listing = TransactionListing {
            transactions: parse_transactions(&output),
            account_number: query.account.account.clone(),
            iban: None,
            bank_code: query.account.bank_code.clone(),
        };
        tracing::debug!(count = listing.transactions.len(), "transactions parsed");
        Ok(BackendResponse::captured(listing, output))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn list_accounts(&self) -> Result<BackendResponse<Vec<Account>>> {
        let output = self.run(Tool::HbciTool, vec!["listaccounts".to_owned()])?;
        Ok(BackendResponse::captured(parse_accounts(&output), output))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn list_users(&self) -> Result<BackendResponse<Vec<User>>> {
        let output = self.run(Tool::HbciTool, vec!["listusers".to_owned()])?;
        Ok(BackendResponse::captured(parse_users(&output), output))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn system_id(&self) -> Result<BackendResponse<String>> {
        let mut args = hbci_args(&self.config);
        args.push("getsysid".to_owned());
        let output = self.run(Tool::HbciTool, args)?;
        Ok(BackendResponse::captured(parse_system_id(&output)?, output))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.kind()))]
    fn tan_methods(&self) -> Result<BackendResponse<Vec<TanMethod>>> {
        let mut args = hbci_args(&self.config);
        args.push("getitanmodes".to_owned());
        let output = self.run(Tool::HbciTool, args)?;
        Ok(BackendResponse::captured(parse_tan_methods(&output)?, output))
    }
}
