//! CLI binary for querying a bank through `AqBanking`.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aqbanking_rs::config::BankingConfig;
use aqbanking_rs::dispatcher::{Dispatcher, FailurePolicy, OutputOptions, Parameters, Request};
use aqbanking_rs::models::{
    Account, BackendKind, BalanceResponse, DateRangeSelector, NaiveDate, Operation,
    OperationOutput, OutputFormat, TanMethod, Transaction, User,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Query balances, transactions and account data over FinTS/HBCI.
#[derive(Debug, Parser)]
#[command(name = "aqbanking", version, about)]
struct Cli {
    /// Read settings from a JSON file instead of `AQBANKING_*` variables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Override the configured backend (native, system, python, docker).
    #[arg(long, global = true, value_name = "KIND")]
    backend: Option<BackendKind>,
    /// Print the canonical JSON record instead of tables.
    #[arg(long, global = true)]
    json: bool,
    /// Include the raw backend output.
    #[arg(long, global = true)]
    raw: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Show the balance of one account.
    Balance(AccountArgs),
    /// List transactions of one account.
    Transactions(TransactionArgs),
    /// Export transactions of one account as CSV (or JSON).
    Export {
        /// Account and date window.
        #[command(flatten)]
        listing: TransactionArgs,
        /// Export format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },
    /// List accounts known to the backend.
    Accounts,
    /// Show one account, matched by number or IBAN.
    AccountInfo(AccountArgs),
    /// List configured users.
    Users,
    /// Retrieve the FinTS system id.
    SystemId,
    /// List the TAN methods the bank offers.
    TanMethods,
    /// Run the requests in a JSON file (an array of request objects).
    Batch {
        /// Request file.
        file: PathBuf,
        /// Record failures and continue instead of stopping at the first.
        #[arg(long)]
        keep_going: bool,
    },
}

/// Account selection.
#[derive(Debug, Args)]
struct AccountArgs {
    /// Account number or IBAN.
    account: String,
    /// Bank code, if different from the configured one.
    #[arg(long)]
    bank_code: Option<String>,
}

/// Arguments for transaction listings.
#[derive(Debug, Args)]
struct TransactionArgs {
    /// Account selection.
    #[command(flatten)]
    account: AccountArgs,
    /// Date window (all, last30Days, last90Days, custom). Defaults to
    /// custom when --from or --to is given, otherwise last30Days.
    #[arg(long)]
    range: Option<DateRangeSelector>,
    /// Start date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Keep at most this many transactions (0 keeps all).
    #[arg(long, default_value_t = 0)]
    max: usize,
}

impl TransactionArgs {
    /// Selector implied by the flags.
    fn selector(&self) -> DateRangeSelector {
        match self.range {
            Some(range) => range,
            None if self.from.is_some() || self.to.is_some() => DateRangeSelector::Custom,
            None => DateRangeSelector::Last30Days,
        }
    }

    /// Request parameters for these flags.
    fn parameters(&self, options: OutputOptions) -> Parameters {
        Parameters {
            account_number: Some(self.account.account.clone()),
            bank_code: self.account.bank_code.clone(),
            date_range: self.selector(),
            start_date: self.from.map(|date| date.to_string()),
            end_date: self.to.map(|date| date.to_string()),
            options: OutputOptions {
                max_results: self.max,
                ..options
            },
        }
    }
}

/// Parses a date string for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    aqbanking_rs::normalize::parse_date_input(s).map_err(|err| err.to_string())
}

/// Builds the request for a single-request subcommand.
fn single_request(command: &Command, options: OutputOptions) -> Option<Request> {
    let account_params = |args: &AccountArgs| Parameters {
        account_number: Some(args.account.clone()),
        bank_code: args.bank_code.clone(),
        options,
        ..Parameters::default()
    };
    let plain = |operation: Operation| {
        Request::new(operation).with_params(Parameters {
            options,
            ..Parameters::default()
        })
    };

    Some(match *command {
        Command::Balance(ref args) => {
            Request::new(Operation::GetBalance).with_params(account_params(args))
        }
        Command::Transactions(ref args) => {
            Request::new(Operation::GetTransactions).with_params(args.parameters(options))
        }
        Command::Export {
            ref listing,
            format,
        } => Request::new(Operation::ExportTransactions).with_params(listing.parameters(
            OutputOptions {
                output_format: format,
                ..options
            },
        )),
        Command::Accounts => plain(Operation::ListAccounts),
        Command::AccountInfo(ref args) => {
            Request::new(Operation::GetAccountInfo).with_params(account_params(args))
        }
        Command::Users => plain(Operation::ListUsers),
        Command::SystemId => plain(Operation::GetSystemId),
        Command::TanMethods => plain(Operation::GetTanMethods),
        Command::Batch { .. } => return None,
    })
}

/// Loads settings from `--config` or the environment and applies
/// `--backend`.
fn load_config(
    path: Option<&Path>,
    backend: Option<BackendKind>,
) -> aqbanking_rs::error::Result<BankingConfig> {
    let mut config = match path {
        Some(path) => BankingConfig::from_json_file(path)?,
        None => BankingConfig::from_env()?,
    };
    if let Some(kind) = backend {
        config.backend = kind;
    }
    Ok(config)
}

/// Reads a batch file.
fn read_batch(path: &Path) -> aqbanking_rs::error::Result<Vec<Request>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Prints an error line to stderr.
fn report(context: &str, err: &dyn core::fmt::Display) -> io::Result<()> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.backend) {
        Ok(config) => config,
        Err(err) => {
            report("failed to load configuration", &err)?;
            writeln!(
                io::stderr().lock(),
                "  {} set AQBANKING_BANK_CODE and AQBANKING_USER_ID or pass --config",
                "hint:".cyan()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let dispatcher = match Dispatcher::new(config) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            report("failed to set up backend", &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let options = OutputOptions {
        include_raw_output: cli.raw,
        ..OutputOptions::default()
    };

    match cli.command {
        Command::Batch {
            ref file,
            keep_going,
        } => cmd_batch(&dispatcher, file, keep_going, cli.json),
        ref command => match single_request(command, options) {
            Some(request) => cmd_single(&dispatcher, &request, cli.json),
            None => Ok(ExitCode::FAILURE),
        },
    }
}

/// Executes one request and prints the result.
fn cmd_single(dispatcher: &Dispatcher, request: &Request, json: bool) -> io::Result<ExitCode> {
    let spinner = make_spinner(&format!(
        "Running {} via {} backend...",
        request.operation,
        dispatcher.backend_kind()
    ));
    let result = dispatcher.execute(request);
    spinner.finish_and_clear();

    match result {
        Ok(output) => {
            if json {
                print_json(&output)?;
            } else {
                print_output(&output)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(&format!("{} failed", request.operation), &err)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes a batch file and prints every record.
fn cmd_batch(
    dispatcher: &Dispatcher,
    file: &Path,
    keep_going: bool,
    json: bool,
) -> io::Result<ExitCode> {
    let requests = match read_batch(file) {
        Ok(requests) => requests,
        Err(err) => {
            report(&format!("cannot read {}", file.display()), &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let policy = if keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };

    let spinner = make_spinner(&format!("Running {} requests...", requests.len()));
    let result = dispatcher.execute_batch(&requests, policy);
    spinner.finish_and_clear();

    let outputs = match result {
        Ok(outputs) => outputs,
        Err(err) => {
            report("batch aborted", &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        let value = serde_json::to_string_pretty(&outputs).map_err(io::Error::other)?;
        writeln!(io::stdout().lock(), "{value}")?;
    } else {
        for output in &outputs {
            print_output(output)?;
        }
    }

    if outputs.iter().any(|output| output.as_error().is_some()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints a record as pretty JSON.
fn print_json(output: &OperationOutput) -> io::Result<()> {
    let text = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
    writeln!(io::stdout().lock(), "{text}")
}

/// Prints a record in human-readable form.
fn print_output(output: &OperationOutput) -> io::Result<()> {
    let raw = match *output {
        OperationOutput::Balance(ref response) => {
            print_balance(response)?;
            response.raw_output.as_deref()
        }
        OperationOutput::Transactions(ref response) => {
            print_transactions_table(&response.transactions)?;
            response.raw_output.as_deref()
        }
        OperationOutput::Export(ref response) => {
            match response.csv_data.as_deref() {
                Some(csv) => write!(io::stdout().lock(), "{csv}")?,
                None => print_json(output)?,
            }
            None
        }
        OperationOutput::Accounts(ref response) => {
            print_accounts_table(&response.accounts)?;
            response.raw_output.as_deref()
        }
        OperationOutput::AccountInfo(ref response) => {
            print_accounts_table(core::slice::from_ref(&response.account))?;
            response.raw_output.as_deref()
        }
        OperationOutput::Users(ref response) => {
            print_users_table(&response.users)?;
            response.raw_output.as_deref()
        }
        OperationOutput::SystemId(ref response) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "System ID:".green().bold(),
                response.system_id
            )?;
            response.raw_output.as_deref()
        }
        OperationOutput::TanMethods(ref response) => {
            print_tan_methods_table(&response.tan_methods)?;
            response.raw_output.as_deref()
        }
        OperationOutput::Error(ref record) => {
            writeln!(
                io::stdout().lock(),
                "{} {}/{}: {}",
                "error:".red().bold(),
                record.resource,
                record.operation,
                record.error
            )?;
            None
        }
    };
    if let Some(text) = raw {
        print_raw(text)?;
    }
    Ok(())
}

/// Prints the raw backend output.
fn print_raw(text: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out)?;
    writeln!(out, "{}", "Raw output".dimmed())?;
    writeln!(out, "{text}")?;
    Ok(())
}

/// Prints a balance.
fn print_balance(response: &BalanceResponse) -> io::Result<()> {
    let balance = &response.balance;
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{} {}",
        "Balance".green().bold(),
        format_args!("({})", balance.account_number).dimmed()
    )?;
    let amount = format!("{:.2} {}", balance.amount, balance.currency);
    if balance.amount < 0.0_f64 {
        writeln!(out, "  {}", amount.red())?;
    } else {
        writeln!(out, "  {}", amount.bold())?;
    }
    if let Some(iban) = balance.iban.as_deref() {
        writeln!(out, "  {} {iban}", "IBAN:".bold())?;
    }
    if let Some(code) = balance.bank_code.as_deref() {
        writeln!(out, "  {} {code}", "Bank code:".bold())?;
    }
    Ok(())
}

/// Returns `value`, or a dash when empty.
fn or_dash(value: &str) -> &str {
    if value.is_empty() { "\u{2014}" } else { value }
}

/// Prints transactions in a table.
fn print_transactions_table(txs: &[Transaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Remote").fg(Color::Cyan),
        Cell::new("Purpose").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);

    for tx in txs {
        let amount = format!("{:.2} {}", tx.amount, tx.currency);
        let amount_cell = if tx.amount < 0.0_f64 {
            Cell::new(amount).fg(Color::Red)
        } else {
            Cell::new(amount).fg(Color::Green)
        };
        _ = table.add_row(vec![
            Cell::new(or_dash(&tx.date)),
            Cell::new(or_dash(&tx.remote_name)),
            Cell::new(&tx.purpose),
            amount_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", txs.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints accounts in a table.
fn print_accounts_table(accounts: &[Account]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if accounts.is_empty() {
        writeln!(out, "{}", "No accounts found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Number").fg(Color::Cyan),
        Cell::new("IBAN").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Bank code").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
    ]);

    for acc in accounts {
        _ = table.add_row(vec![
            Cell::new(or_dash(&acc.account_number)),
            Cell::new(or_dash(&acc.iban)),
            Cell::new(or_dash(&acc.account_name)),
            Cell::new(or_dash(&acc.bank_code)),
            Cell::new(or_dash(&acc.account_type)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Accounts".green().bold(),
        format_args!("({})", accounts.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints users in a table.
fn print_users_table(users: &[User]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if users.is_empty() {
        writeln!(out, "{}", "No users found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("User ID").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Bank code").fg(Color::Cyan),
    ]);
    for user in users {
        _ = table.add_row(vec![
            Cell::new(&user.user_id),
            Cell::new(or_dash(&user.user_name)),
            Cell::new(or_dash(&user.bank_code)),
        ]);
    }

    writeln!(out, "{}", "Users".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints TAN methods in a table.
fn print_tan_methods_table(methods: &[TanMethod]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if methods.is_empty() {
        writeln!(out, "{}", "No TAN methods reported.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
    ]);
    for method in methods {
        _ = table.add_row(vec![Cell::new(&method.id), Cell::new(&method.name)]);
    }

    writeln!(out, "{}", "TAN methods".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last resort: stderr itself may be gone.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
