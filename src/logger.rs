//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `OutputSink`, the append-only log that build steps stream tool output into
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "importing {}", fbx.display());
//!
//! let mut sink = ConsoleSink::new("maskmaker");
//! sink.append("Done!");
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::OnceLock,
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;

/// Calculate total prefix length for a module name.
///
/// Returns: `module.len() + 3` (for `[`, `]`, and trailing space)
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Automatically truncates long single-line messages to fit terminal width.
#[inline]
pub fn log(module: &str, message: &str) {
    write_line(module, message, Some(get_terminal_width() as usize));
}

/// Like [`log`], but never truncates. Used for tool output, which the user
/// has to be able to read in full.
#[inline]
pub fn log_full(module: &str, message: &str) {
    write_line(module, message, None);
}

fn write_line(module: &str, message: &str, width: Option<usize>) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {}", fit_message(module, message, width)).ok();
    stdout.flush().ok();
}

/// The part of `message` that is printed after the prefix. Multi-line
/// messages and messages without a width limit are kept whole.
fn fit_message<'a>(module: &str, message: &'a str, width: Option<usize>) -> &'a str {
    match width {
        Some(width) if !message.contains('\n') => {
            truncate_str(message, width.saturating_sub(calc_prefix_len(module.len())))
        }
        _ => message,
    }
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "svn" => prefix.bright_blue().bold(),
        "build" => prefix.bright_green().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Output Sink
// ============================================================================

/// Append-only receiver for the text produced by build steps.
///
/// Every external invocation forwards its output here line by line. Failures
/// show up as lines too; nothing is ever removed.
pub trait OutputSink {
    fn append(&mut self, line: &str);
}

impl OutputSink for Vec<String> {
    fn append(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

/// Sink that prints every line through `log!` under one module prefix.
pub struct ConsoleSink {
    module: &'static str,
}

impl ConsoleSink {
    pub const fn new(module: &'static str) -> Self {
        Self { module }
    }
}

impl OutputSink for ConsoleSink {
    fn append(&mut self, line: &str) {
        if line.starts_with("ERROR ") {
            log_full("error", line);
        } else {
            log_full(self.module, line);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
