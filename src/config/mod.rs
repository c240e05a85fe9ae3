//! Project configuration management for `arttool.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[tools]`   | maskmaker and svn commands, morph rest pose     |
//! | `[meta]`    | License, website and author for new sidecars    |
//! | `[upload]`  | Object storage command, bucket and key prefix   |
//!
//! # Example
//!
//! ```toml
//! [tools]
//! maskmaker = ["~/bin/maskmaker"]
//! morph_rest = "morphs/morph_rest.fbx"
//!
//! [meta]
//! author = "sam"
//!
//! [upload]
//! bucket = "mask-releases"
//! prefix = "masks/"
//! ```
//!
//! The file is optional; every field has a default.

pub mod defaults;
mod error;
mod sections;
mod window;

pub use error::ConfigError;
pub use sections::{MetaConfig, ToolsConfig, UploadConfig};
pub use window::WindowConfig;

use crate::{cli::Cli, log, utils::path::normalize_path};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing arttool.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ArtConfig {
    /// Absolute working copy root (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub meta: MetaConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

impl ArtConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: ArtConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config file named on the command line, relative to the root.
    /// A missing file yields the defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let path = root.join(&cli.config);

        let mut config = if path.exists() {
            Self::from_path(&path)?
        } else {
            log!("config"; "{} not found, using defaults", path.display());
            Self::default()
        };
        config.update_with_root(&root, &cli.config);
        Ok(config)
    }

    /// Resolve every path against `root` and expand `~` in tool commands.
    ///
    /// A program given as a relative path (`bin/maskmaker`) is resolved
    /// against the root; bare names are left for `PATH` lookup.
    pub fn update_with_root(&mut self, root: &Path, config: &Path) {
        self.root = normalize_path(root);
        self.config_path = normalize_path(&self.root.join(config));

        let morph_rest = expand_tilde(&self.tools.morph_rest.to_string_lossy());
        self.tools.morph_rest = normalize_path(&self.root.join(morph_rest));

        for command in [
            &mut self.tools.maskmaker,
            &mut self.tools.svn,
            &mut self.upload.command,
        ] {
            if let Some(program) = command.first_mut() {
                *program = expand_tilde(program);
                if program.contains(['/', '\\']) && Path::new(program.as_str()).is_relative() {
                    *program = normalize_path(&self.root.join(&*program))
                        .to_string_lossy()
                        .into_owned();
                }
            }
        }
    }

    /// Check the configuration before any command runs.
    ///
    /// Empty command vectors are errors. Programs that cannot be found only
    /// produce warnings, and the run continues without them; the names of the
    /// missing programs are returned.
    pub fn validate(&self) -> Result<Vec<String>> {
        let commands = [
            ("[tools.maskmaker]", &self.tools.maskmaker),
            ("[tools.svn]", &self.tools.svn),
            ("[upload.command]", &self.upload.command),
        ];

        let mut missing = Vec::new();
        for (field, command) in commands {
            let Some(program) = command.first() else {
                bail!(ConfigError::Validation(format!(
                    "{field} must have at least one element"
                )));
            };
            if which::which(program).is_err() {
                log!("warn"; "`{}` not found, {} features are unavailable", program, field);
                missing.push(program.clone());
            }
        }

        if !self.tools.morph_rest.exists() {
            log!("warn"; "[tools.morph_rest] `{}` not found, morph imports will fail", self.tools.morph_rest.display());
        }

        Ok(missing)
    }
}

fn expand_tilde(s: &str) -> String {
    shellexpand::tilde(s).into_owned()
}

// ============================================================================
// Tests
// ============================================================================
