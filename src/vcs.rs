//! Version control over the svn command line.
//!
//! All coordination through svn is advisory: callers may warn about pending
//! changes or an out-of-date working copy, but nothing here blocks or locks.
//! A missing svn binary degrades every query to "clean" and every mutation to
//! a no-op, with a logged warning.

use crate::{
    log,
    logger::OutputSink,
    utils::exec::{self, ExecOutcome, internal::to_cmd_vec},
};
use regex::Regex;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Status of one path as reported by `svn status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Versioned and unchanged (svn prints nothing)
    Clean,
    Untracked,
    Added,
    Modified,
    Deleted,
    Missing,
    Other(char),
}

impl FileStatus {
    pub const fn from_code(code: char) -> Self {
        match code {
            '?' => Self::Untracked,
            'A' => Self::Added,
            'M' => Self::Modified,
            'D' => Self::Deleted,
            '!' => Self::Missing,
            c => Self::Other(c),
        }
    }

    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// Summary of `svn status -uq` over the working copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingCopyStatus {
    /// Some versioned file is missing on disk
    pub missing: bool,
    /// Some file is added, modified or deleted and not yet committed
    pub pending: bool,
    pub untracked: bool,
}

/// Result of `svn update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub success: bool,
    /// Paths that were added, updated, merged or deleted
    pub changed: Vec<String>,
}

pub trait VersionControl {
    fn status(&self) -> WorkingCopyStatus;

    fn file_status(&self, path: &Path) -> FileStatus;

    fn add(&self, path: &Path) -> bool;

    /// Last changed revision of the working copy, or of `HEAD` when `head` is set.
    fn revision(&self, head: bool) -> Option<u64>;

    fn update(&self, sink: &mut dyn OutputSink) -> UpdateReport;

    /// Stage `path` if svn does not know it yet. Returns whether it was added.
    fn add_if_untracked(&self, path: &Path) -> bool {
        self.file_status(path) == FileStatus::Untracked && self.add(path)
    }

    fn needs_commit(&self) -> bool {
        self.status().pending
    }

    fn needs_update(&self) -> bool {
        let have = self.revision(false).unwrap_or(0);
        let head = self.revision(true).unwrap_or(0);
        head > have || self.status().missing
    }
}

/// The svn command line client, run from the working copy root.
pub struct Svn {
    command: Vec<String>,
    root: PathBuf,
}

impl Svn {
    pub const fn new(command: Vec<String>, root: PathBuf) -> Self {
        Self { command, root }
    }

    fn program(&self) -> &str {
        self.command.first().map_or("svn", String::as_str)
    }

    fn run(&self, args: &[OsString]) -> Option<ExecOutcome> {
        match exec::exec(
            Some(self.root.as_path()),
            &to_cmd_vec(&self.command),
            args,
            &exec::EMPTY_FILTER,
        ) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log!("warn"; "{} unavailable: {:#}", self.program(), e);
                None
            }
        }
    }

    fn run_lines(&self, args: &[&str]) -> Vec<String> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        self.run(&args).map(|o| o.lines).unwrap_or_default()
    }
}

impl VersionControl for Svn {
    fn status(&self) -> WorkingCopyStatus {
        parse_status(&self.run_lines(&["status", "-uq"]))
    }

    fn file_status(&self, path: &Path) -> FileStatus {
        let args = [OsString::from("status"), absolute(path).into_os_string()];
        let lines = self.run(&args).map(|o| o.lines).unwrap_or_default();
        lines
            .first()
            .and_then(|line| line.chars().next())
            .map_or(FileStatus::Clean, FileStatus::from_code)
    }

    fn add(&self, path: &Path) -> bool {
        let args = [OsString::from("add"), absolute(path).into_os_string()];
        match self.run(&args) {
            Some(outcome) if outcome.success => {
                log!("svn"; "added {}", path.display());
                true
            }
            Some(outcome) => {
                for line in outcome.log_lines() {
                    log!("svn"; "{}", line);
                }
                false
            }
            None => false,
        }
    }

    fn revision(&self, head: bool) -> Option<u64> {
        let lines = if head {
            self.run_lines(&["info", "-r", "HEAD"])
        } else {
            self.run_lines(&["info"])
        };
        parse_last_changed_rev(&lines)
    }

    fn update(&self, sink: &mut dyn OutputSink) -> UpdateReport {
        let Some(outcome) = self.run(&[OsString::from("update")]) else {
            ExecOutcome::not_started(self.program()).forward(sink);
            return UpdateReport::default();
        };
        outcome.forward(sink);
        UpdateReport {
            success: outcome.success,
            changed: parse_updated_paths(&outcome.lines),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// Output parsing
// ============================================================================

/// Fold `svn status -uq` lines by their leading status token.
pub fn parse_status(lines: &[String]) -> WorkingCopyStatus {
    let mut status = WorkingCopyStatus::default();
    for code in lines.iter().filter_map(|l| l.chars().next()) {
        match FileStatus::from_code(code) {
            FileStatus::Missing => status.missing = true,
            FileStatus::Untracked => status.untracked = true,
            s if s.is_pending() => status.pending = true,
            _ => {}
        }
    }
    status
}

/// Extract the number from a `Last Changed Rev: N` line.
pub fn parse_last_changed_rev(lines: &[String]) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i-u)^[ \t]*last changed rev:[ \t]*([0-9]+)").unwrap());
    lines
        .iter()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps[1].parse().ok())
}

/// Paths touched by `svn update` (`A`, `U`, `G`, `D` lines).
pub fn parse_updated_paths(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| {
            let (code, path) = line.split_once(char::is_whitespace)?;
            matches!(code, "A" | "U" | "G" | "D").then(|| path.trim().to_owned())
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_owned).collect()
    }

    #[test]
    fn test_parse_status_pending_and_missing() {
        let out = lines(
            "M       masks/hat.fbx\n!       masks/.art/gone.meta\nStatus against revision:   1042",
        );
        let status = parse_status(&out);
        assert!(status.pending);
        assert!(status.missing);
        assert!(!status.untracked);
    }

    #[test]
    fn test_parse_status_clean() {
        let status = parse_status(&lines("Status against revision:   1042"));
        assert_eq!(status, WorkingCopyStatus::default());
    }

    #[test]
    fn test_parse_last_changed_rev() {
        let out = lines("Path: .\nURL: svn://art/masks\nLast Changed Author: sam\nLast Changed Rev: 1038\n");
        assert_eq!(parse_last_changed_rev(&out), Some(1038));
        assert_eq!(parse_last_changed_rev(&lines("Path: .")), None);
    }

    #[test]
    fn test_parse_updated_paths() {
        let out = lines("Updating '.':\nU    masks/hat.fbx\nA    masks/new.fbx\nUpdated to revision 1043.");
        assert_eq!(parse_updated_paths(&out), vec!["masks/hat.fbx", "masks/new.fbx"]);
    }

    #[test]
    fn test_file_status_codes() {
        assert_eq!(FileStatus::from_code('?'), FileStatus::Untracked);
        assert!(FileStatus::from_code('M').is_pending());
        assert!(!FileStatus::from_code('!').is_pending());
    }

    struct Scripted {
        file: FileStatus,
        have: u64,
        head: u64,
        added: RefCell<Vec<PathBuf>>,
    }

    impl VersionControl for Scripted {
        fn status(&self) -> WorkingCopyStatus {
            WorkingCopyStatus::default()
        }
        fn file_status(&self, _: &Path) -> FileStatus {
            self.file
        }
        fn add(&self, path: &Path) -> bool {
            self.added.borrow_mut().push(path.to_path_buf());
            true
        }
        fn revision(&self, head: bool) -> Option<u64> {
            Some(if head { self.head } else { self.have })
        }
        fn update(&self, _: &mut dyn OutputSink) -> UpdateReport {
            UpdateReport::default()
        }
    }

    #[test]
    fn test_add_if_untracked_only_adds_new_files() {
        let vcs = Scripted {
            file: FileStatus::Clean,
            have: 1,
            head: 1,
            added: RefCell::default(),
        };
        assert!(!vcs.add_if_untracked(Path::new("hat.json")));
        assert!(vcs.added.borrow().is_empty());

        let vcs = Scripted {
            file: FileStatus::Untracked,
            ..vcs
        };
        assert!(vcs.add_if_untracked(Path::new("hat.json")));
        assert_eq!(vcs.added.borrow().len(), 1);
    }

    #[test]
    fn test_needs_update_compares_revisions() {
        let vcs = Scripted {
            file: FileStatus::Clean,
            have: 10,
            head: 12,
            added: RefCell::default(),
        };
        assert!(vcs.needs_update());

        let vcs = Scripted { head: 10, ..vcs };
        assert!(!vcs.needs_update());
    }

    #[test]
    fn test_missing_svn_binary_degrades() {
        let dir = tempfile::TempDir::new().unwrap();
        let svn = Svn::new(vec!["definitely-not-svn-41d2".into()], dir.path().to_path_buf());
        assert_eq!(svn.status(), WorkingCopyStatus::default());
        assert_eq!(svn.file_status(Path::new("x")), FileStatus::Clean);
        assert!(!svn.add(Path::new("x")));
        assert_eq!(svn.revision(true), None);

        let mut sink: Vec<String> = Vec::new();
        let report = svn.update(&mut sink);
        assert!(!report.success);
        assert_eq!(sink, vec!["ERROR definitely-not-svn-41d2 FAILED EXECUTION."]);
    }

    #[test]
    fn test_missing_svn_binary_needs_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let svn = Svn::new(vec!["definitely-not-svn-41d2".into()], dir.path().to_path_buf());
        assert!(!svn.needs_update());
        assert!(!svn.needs_commit());
    }

    #[test]
    fn test_parse_last_changed_rev_ignores_case_and_indent() {
        let out = lines("  LAST CHANGED REV:\t77");
        assert_eq!(parse_last_changed_rev(&out), Some(77));
        assert_eq!(parse_last_changed_rev(&lines("Last Changed Rev: none")), None);
    }
}
