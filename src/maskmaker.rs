//! The maskmaker conversion tool.
//!
//! maskmaker is invoked as `maskmaker <command> [key=value ...] <file ...>`.
//! Arguments are collected in an ordered [`ToolArgs`] list; the rendered
//! command line quotes string values (`key="value"`) and leaves numbers and
//! booleans bare, which is also how it is shown in the log.

use crate::{
    log,
    logger::OutputSink,
    utils::exec::{self, ExecOutcome, FilterRule},
};
use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};

/// Debug chatter printed by `merge` and by argument parsing.
const MASKMAKER_FILTER: FilterRule = FilterRule::new(&["key before", "key after", "kvpair:"]);

// ============================================================================
// Arguments
// ============================================================================

/// A single argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ToolValue {
    /// Coerce free text: integer if it parses, else float, else string.
    pub fn coerce(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            Self::Int(i)
        } else if let Ok(f) = text.parse::<f64>() {
            Self::Float(f)
        } else {
            Self::Str(text.to_owned())
        }
    }

    pub const fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }
}

impl fmt::Display for ToolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part: 2.0 renders as "2.0", not "2"
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ToolValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for ToolValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ToolValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for ToolValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for ToolValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for ToolValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Ordered `key=value` argument list. Setting an existing key replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Vec<(String, ToolValue)>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ToolArgs::set`].
    pub fn with(mut self, key: &str, value: impl Into<ToolValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ToolValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key.to_owned(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ToolValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ToolValue> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Process arguments, one `key=value` element per pair.
    pub fn to_argv(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Display form with string values quoted.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| {
                if v.is_str() {
                    format!("{k}=\"{v}\"")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Tool seam
// ============================================================================

/// The external asset-processing tool, as seen by the build orchestrator.
pub trait AssetTool {
    /// Run `command` against `files`, forwarding every output line to `sink`.
    ///
    /// Returns whether the process exited successfully. Failures are also
    /// visible in the sink as a synthetic `ERROR` line.
    fn run(&self, command: &str, args: &ToolArgs, files: &[PathBuf], sink: &mut dyn OutputSink)
    -> bool;

    /// Sub-resource paths referenced by `source`, relative to its directory.
    fn depends(&self, source: &Path) -> Vec<String>;
}

/// The real maskmaker binary.
pub struct MaskMaker {
    command: Vec<String>,
}

impl MaskMaker {
    pub const fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn program(&self) -> &str {
        self.command.first().map_or("maskmaker", String::as_str)
    }

    fn invoke(&self, command: &str, args: &ToolArgs, files: &[PathBuf]) -> anyhow::Result<ExecOutcome> {
        let cmd: Vec<OsString> = self.command.iter().map(OsString::from).collect();
        let mut argv: Vec<OsString> = vec![command.into()];
        argv.extend(args.to_argv().into_iter().map(OsString::from));
        argv.extend(files.iter().map(OsString::from));
        exec::exec(None, &cmd, &argv, &MASKMAKER_FILTER)
    }
}

impl AssetTool for MaskMaker {
    fn run(
        &self,
        command: &str,
        args: &ToolArgs,
        files: &[PathBuf],
        sink: &mut dyn OutputSink,
    ) -> bool {
        log!("maskmaker"; "{}", render_command_line(self.program(), command, args, files));

        match self.invoke(command, args, files) {
            Ok(outcome) => {
                outcome.forward(sink);
                outcome.success
            }
            Err(e) => {
                log!("error"; "{:#}", e);
                ExecOutcome::not_started(self.program()).forward(sink);
                false
            }
        }
    }

    fn depends(&self, source: &Path) -> Vec<String> {
        let source = std::path::absolute(source).unwrap_or_else(|_| source.to_path_buf());
        match self.invoke("depends", &ToolArgs::new(), &[source.clone()]) {
            Ok(outcome) if outcome.success => outcome.lines,
            Ok(outcome) => {
                log!("warn"; "depends failed for {}", source.display());
                outcome.lines
            }
            Err(e) => {
                log!("error"; "{:#}", e);
                Vec::new()
            }
        }
    }
}

/// Full command line as shown in the log.
pub fn render_command_line(program: &str, command: &str, args: &ToolArgs, files: &[PathBuf]) -> String {
    let mut line = format!("{program} {command}");
    if !args.is_empty() {
        line.push(' ');
        line.push_str(&args.render());
    }
    for file in files {
        line.push(' ');
        line.push_str(&file.to_string_lossy());
    }
    line
}
