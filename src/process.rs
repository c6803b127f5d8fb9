//! Subprocess execution.
//!
//! Backends never touch [`std::process`] directly. They describe the
//! command as an [`Invocation`] and hand it to a [`ProcessRunner`], which
//! lets tests substitute a scripted runner.

use std::io::Write as _;
use std::process::{Command, Stdio};

use secrecy::{ExposeSecret as _, SecretString};

use crate::error::{BankingError, Result};
use crate::models::BackendKind;

/// A fully described external command.
#[derive(Debug, Default)]
pub struct Invocation {
    /// Program name or path.
    program: String,
    /// Arguments, in order.
    args: Vec<String>,
    /// Extra environment for this spawn only.
    env: Vec<(String, String)>,
    /// Payload written to standard input, then closed.
    stdin: Option<SecretString>,
}

impl Invocation {
    /// Creates an invocation of `program` without arguments.
    #[inline]
    #[must_use]
    pub fn new<P: Into<String>>(program: P) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    #[inline]
    #[must_use]
    pub fn arg<A: Into<String>>(mut self, arg: A) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[inline]
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for this spawn.
    #[inline]
    #[must_use]
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the standard-input payload.
    #[inline]
    #[must_use]
    pub fn stdin(mut self, payload: SecretString) -> Self {
        self.stdin = Some(payload);
        self
    }

    /// Program name or path.
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Per-spawn environment.
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// Standard-input payload, if any.
    #[inline]
    #[must_use]
    pub const fn stdin_payload(&self) -> Option<&SecretString> {
        self.stdin.as_ref()
    }

    /// Program and arguments joined by spaces, for logs and messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        core::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code; `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Returns `true` if the process exited with code 0.
    #[inline]
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Runs an [`Invocation`] to completion and captures its output.
pub trait ProcessRunner: core::fmt::Debug + Send + Sync {
    /// Spawns the command, feeds stdin, and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the process cannot be spawned or its pipes
    /// fail. A non-zero exit is *not* an error at this level.
    fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput> {
        let mut command = Command::new(&invocation.program);
        _ = command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(key, value)| (key, value)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn()?;
        if let Some(payload) = invocation.stdin.as_ref()
            && let Some(mut pipe) = child.stdin.take()
        {
            // A child that exits without reading stdin is reported through
            // its exit status, not as a write failure.
            if let Err(err) = pipe.write_all(payload.expose_secret().as_bytes()) {
                tracing::debug!(error = %err, "stdin write failed");
            }
        }

        let output = child.wait_with_output()?;
        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Runs `invocation` and returns its standard output.
///
/// # Errors
///
/// - [`BankingError::BackendUnavailable`] if the program cannot be spawned.
/// - [`BankingError::BackendExecution`] on a non-zero exit, carrying the
///   trimmed standard error (or standard output if stderr is empty).
#[tracing::instrument(skip_all, fields(backend = %backend, program = invocation.program()))]
pub fn run_checked(
    runner: &dyn ProcessRunner,
    backend: BackendKind,
    invocation: &Invocation,
) -> Result<String> {
    tracing::debug!(command = %invocation.command_line(), "spawning");
    let output = runner
        .run(invocation)
        .map_err(|err| BankingError::BackendUnavailable {
            backend,
            reason: format!("cannot run `{}`: {err}", invocation.program),
        })?;
    tracing::trace!(
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        exit_code = ?output.exit_code,
        "process finished"
    );

    if output.success() {
        return Ok(output.stdout);
    }

    let diagnostic = if output.stderr.trim().is_empty() {
        output.stdout.trim()
    } else {
        output.stderr.trim()
    };
    let status = output
        .exit_code
        .map_or_else(|| "was terminated by a signal".to_owned(), |code| format!("exited with code {code}"));
    Err(BankingError::BackendExecution {
        backend,
        message: format!("`{}` {status}: {diagnostic}", invocation.program),
    })
}
