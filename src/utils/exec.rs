//! External command execution utilities.
//!
//! Provides a macro and functions for running the external binaries this tool
//! drives (maskmaker, svn, the upload CLI) and collecting their output as
//! lines. A non-zero exit never raises: it is recorded on the returned
//! [`ExecOutcome`] and rendered as a synthetic `ERROR` line for the output log.

use crate::logger::OutputSink;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external command with arguments.
///
/// # Examples
/// ```ignore
/// // Without working directory
/// exec!(&config.tools.svn; "status", "-uq")?;
///
/// // With working directory
/// exec!(root; &config.tools.svn; "update")?;
/// ```
#[macro_export]
macro_rules! exec {
    ($cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::exec::exec(
            None,
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            &$crate::utils::exec::EMPTY_FILTER,
        )
    }};
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::exec::exec(
            Some($root),
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            &$crate::utils::exec::EMPTY_FILTER,
        )
    }};
}

// ============================================================================
// Argument Conversion
// ============================================================================

#[doc(hidden)]
pub mod internal {
    use std::ffi::OsString;

    /// Convert to `OsString`.
    #[inline]
    pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
        s.into()
    }

    /// Trait for converting to command vector.
    pub trait ToCmd {
        fn to_cmd(self) -> Vec<OsString>;
    }

    impl<const N: usize> ToCmd for [&str; N] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.into_iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &[String] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &Vec<String> {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.iter().map(OsString::from).collect()
        }
    }

    /// Convert command to `Vec<OsString>`.
    #[inline]
    pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
        cmd.to_cmd()
    }

    /// Filter out empty args.
    #[inline]
    pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
        args.iter().filter(|a| !a.is_empty()).cloned().collect()
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Collected result of one blocking external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Program name as configured (first element of the command vector).
    pub program: String,
    /// Output lines, stdout first then stderr, after filtering.
    pub lines: Vec<String>,
    pub success: bool,
}

impl ExecOutcome {
    /// Outcome for an invocation that could not even be started.
    pub fn not_started(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lines: Vec::new(),
            success: false,
        }
    }

    /// Output lines followed by the synthetic failure line when the process failed.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        if !self.success {
            lines.push(failure_line(&self.program));
        }
        lines
    }

    /// Forward every log line into `sink`.
    pub fn forward(&self, sink: &mut dyn OutputSink) {
        for line in self.log_lines() {
            sink.append(&line);
        }
    }
}

/// The line appended to the output log when a program exits non-zero.
pub fn failure_line(program: &str) -> String {
    format!("ERROR {program} FAILED EXECUTION.")
}

/// Execute a command and capture its output as lines.
///
/// # Errors
/// Returns error only if the command is empty or cannot be spawned. A non-zero
/// exit status is reported through [`ExecOutcome::success`].
pub fn exec(
    root: Option<&Path>,
    cmd: &[OsString],
    args: &[OsString],
    filter: &FilterRule,
) -> Result<ExecOutcome> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    Ok(collect_output(name, &output, filter))
}

/// Prepare a Command from components.
fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

fn collect_output(name: String, output: &Output, filter: &FilterRule) -> ExecOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let lines = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| filter.keep(line))
        .map(|line| strip_ansi(line.trim_end()).into_owned())
        .collect();

    ExecOutcome {
        program: name,
        lines,
        success: output.status.success(),
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Filter rule for dropping noisy output lines by prefix.
///
/// Blank lines are always dropped.
pub struct FilterRule {
    /// Prefixes to match at the start of output lines.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule with the given prefixes.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Check if a line survives the filter.
    pub fn keep(&self, line: &str) -> bool {
        let plain = strip_ansi(line);
        !self.should_skip(plain.trim())
    }
}

/// Empty filter (only blank lines skipped).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

// ============================================================================
// Tests
// ============================================================================
