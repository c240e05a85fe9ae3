//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mask asset metadata and build tool
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Working copy root (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to the root (default: arttool.toml)
    #[arg(short = 'C', long, default_value = "arttool.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List masks and combos with their health
    List {
        /// Only show sources whose path contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show health and staleness of one asset
    Check { source: PathBuf },

    /// Scan the dependencies of one asset and report missing files
    Depends { source: PathBuf },

    /// Build one asset
    Build { source: PathBuf },

    /// Build every stale asset
    Rebuild {
        /// Build everything, stale or not
        #[arg(short, long)]
        force: bool,
    },

    /// Set a metadata field
    Set {
        source: PathBuf,
        field: String,
        value: String,
    },

    /// Edit the additions of a mask
    Additions {
        source: PathBuf,

        #[command(subcommand)]
        action: AdditionAction,
    },

    /// Create or edit combos
    Combo {
        #[command(subcommand)]
        action: ComboAction,
    },

    /// Check the working copy against the repository
    Sync {
        /// Update the working copy when it is out of date
        #[arg(short, long)]
        update: bool,
    },

    /// Upload a release file to object storage
    Upload {
        file: PathBuf,

        /// Object key (default: the file name)
        key: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdditionAction {
    /// Print the additions in order
    List,

    /// Append a new addition
    Add {
        /// image, sequence, material, model, emitter or tweak
        kind: String,
        name: String,
    },

    /// Set a field of one addition, e.g. `rate-min 2.0`
    Edit {
        index: usize,
        key: String,
        value: String,
    },

    Remove { index: usize },

    /// Insert a copy right after the addition
    Dup { index: usize },

    Up { index: usize },

    Down { index: usize },

    /// Append copies of every addition of another mask
    Paste { from: PathBuf },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ComboAction {
    /// Create the metadata for a new combo JSON
    New { source: PathBuf },

    /// Put a mask into a part slot (0-9); an empty mask clears the slot
    Part {
        source: PathBuf,
        slot: usize,
        #[arg(default_value = "")]
        mask: String,
    },
}
