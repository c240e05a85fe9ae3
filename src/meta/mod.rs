//! Per-asset metadata sidecars.
//!
//! Every source asset has one JSON sidecar in a sibling `.art/` directory:
//!
//! ```text
//! masks/Hat.fbx        ->  masks/.art/hat.meta
//! combos/duo.json      ->  combos/.art/duo.combo
//! ```
//!
//! The store loads and creates these records, forces the canonical license
//! on every load, and stages newly created files with version control.

pub mod additions;
pub mod defaults;
mod error;
pub mod health;
pub mod types;

pub use error::MetaError;
pub use health::{HealthStatus, MaskKind, classify};
pub use types::{AssetKind, Dependency, Metadata};

use crate::{
    config::MetaConfig,
    log,
    utils::path::to_slash,
    vcs::VersionControl,
};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// Name of the sidecar directory next to every source.
pub const META_DIR: &str = ".art";

/// Sidecar path for `source`: `<dir>/.art/<lowercased stem>.<meta|combo>`.
pub fn sidecar_path(source: &Path, kind: AssetKind) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(META_DIR)
        .join(format!("{stem}.{}", kind.sidecar_extension()))
}

fn kind_of(source: &Path) -> Result<AssetKind, MetaError> {
    AssetKind::from_source(source).ok_or_else(|| MetaError::UnsupportedSource(source.to_path_buf()))
}

/// Reads and writes sidecars. New-record defaults come from `[meta]`.
pub struct MetaStore<'a> {
    vcs: &'a dyn VersionControl,
    defaults: MetaConfig,
}

impl<'a> MetaStore<'a> {
    pub fn new(vcs: &'a dyn VersionControl, defaults: &MetaConfig) -> Self {
        Self {
            vcs,
            defaults: defaults.clone(),
        }
    }

    /// Load the record for `source` without creating it.
    ///
    /// A missing, empty or syntactically broken sidecar yields `Ok(None)`;
    /// the broken case is logged. Valid JSON that does not fit the record is
    /// an error so that it is never overwritten.
    pub fn load(&self, source: &Path) -> Result<Option<Metadata>, MetaError> {
        let kind = kind_of(source)?;
        let sidecar = sidecar_path(source, kind);
        match read_sidecar(&sidecar) {
            Ok(Some(meta)) => self.prepare(meta, source, kind, &sidecar).map(Some),
            Ok(None) => Ok(None),
            Err(e @ MetaError::Json(..)) => {
                log!("warn"; "{:#}", anyhow::Error::from(e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Load the record for `source`, synthesizing and saving a fresh one when
    /// there is none. A malformed sidecar is kept as `<sidecar>.bak`.
    pub fn load_or_create(&self, source: &Path) -> Result<Metadata, MetaError> {
        if let Some(meta) = self.load(source)? {
            return Ok(meta);
        }

        let kind = kind_of(source)?;
        let sidecar = sidecar_path(source, kind);
        if fs::metadata(&sidecar).is_ok_and(|m| m.len() > 0) {
            let backup = sidecar.with_extension(format!("{}.bak", kind.sidecar_extension()));
            fs::copy(&sidecar, &backup).map_err(|e| MetaError::Io(backup.clone(), e))?;
            log!("warn"; "replaced malformed {}, old copy kept as {}", sidecar.display(), backup.display());
        }

        let mut meta = self.fresh(source, kind);
        self.save(&mut meta)?;
        log!("meta"; "created {}", sidecar.display());
        Ok(meta)
    }

    /// Create the record for a new combo manifest. The manifest itself is
    /// written by the first merge.
    pub fn new_combo(&self, source: &Path) -> Result<Metadata, MetaError> {
        match kind_of(source)? {
            AssetKind::Combo => self.load_or_create(source),
            AssetKind::Mask => Err(MetaError::NotACombo(to_slash(source))),
        }
    }

    /// Normalize tags, then overwrite the sidecar with pretty-printed JSON.
    ///
    /// The `.art` directory is created on demand. Newly created files are
    /// staged with version control; staging failures are only logged.
    pub fn save(&self, meta: &mut Metadata) -> Result<(), MetaError> {
        meta.normalize_tags();

        let sidecar = sidecar_path(meta.source(), meta.kind);
        if let Some(dir) = sidecar.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| MetaError::Io(dir.to_path_buf(), e))?;
                self.vcs.add_if_untracked(dir);
            }
        }

        let is_new = !sidecar.exists();
        let json = to_pretty_json(meta).map_err(|e| MetaError::Json(sidecar.clone(), e))?;
        fs::write(&sidecar, json).map_err(|e| MetaError::Io(sidecar.clone(), e))?;

        if is_new {
            self.vcs.add_if_untracked(&sidecar);
        }
        Ok(())
    }

    /// Health of `source` as shown in asset listings. No sidecar means error.
    pub fn classify_file(&self, source: &Path) -> (HealthStatus, MaskKind) {
        match self.load(source) {
            Ok(Some(meta)) => classify(&meta),
            Ok(None) => (HealthStatus::Error, MaskKind::Unknown),
            Err(e) => {
                log!("warn"; "{:#}", anyhow::Error::from(e));
                (HealthStatus::Error, MaskKind::Unknown)
            }
        }
    }

    fn fresh(&self, source: &Path, kind: AssetKind) -> Metadata {
        let mut meta = Metadata::new(&to_slash(source), kind);
        meta.license.clone_from(&self.defaults.license);
        meta.website.clone_from(&self.defaults.website);
        meta.author.clone_from(&self.defaults.author);
        meta
    }

    fn prepare(
        &self,
        mut meta: Metadata,
        source: &Path,
        kind: AssetKind,
        sidecar: &Path,
    ) -> Result<Metadata, MetaError> {
        meta.kind = kind;
        meta.license.clone_from(&self.defaults.license);
        // The sidecar was found through `source`, so it wins over a stale path
        meta.fbx = to_slash(source);
        meta.additions
            .reconcile(kind)
            .map_err(|found| MetaError::KindMismatch {
                path: sidecar.to_path_buf(),
                kind,
                found,
            })?;
        if kind == AssetKind::Combo {
            meta.category = defaults::COMBO_CATEGORY.to_owned();
        }
        Ok(meta)
    }
}

fn read_sidecar(sidecar: &Path) -> Result<Option<Metadata>, MetaError> {
    let text = match fs::read_to_string(sidecar) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MetaError::Io(sidecar.to_path_buf(), e)),
    };
    if text.trim().is_empty() {
        log!("warn"; "empty sidecar {}", sidecar.display());
        return Ok(None);
    }
    serde_json::from_str(&text).map(Some).map_err(|e| {
        if e.is_data() {
            MetaError::Schema(sidecar.to_path_buf(), e)
        } else {
            MetaError::Json(sidecar.to_path_buf(), e)
        }
    })
}

fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}

// ============================================================================
// Discovery
// ============================================================================

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Every FBX under `root` (any extension case), relative to `root`, sorted.
/// Hidden directories, `.art` included, are skipped.
pub fn find_masks(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && AssetKind::from_source(e.path()) == Some(AssetKind::Mask))
        .map(|e| relative_to(root, e.path()))
        .collect()
}

/// Combo sources under `root`, found through their `.combo` sidecars.
///
/// A combo manifest does not exist until its first merge, so the sidecar is
/// the only reliable trace of one. The directory comes from where the sidecar
/// lives; the stored `fbx` only contributes the file name.
pub fn find_combos(root: &Path) -> Vec<PathBuf> {
    #[derive(Deserialize)]
    struct ComboRef {
        #[serde(default)]
        fbx: String,
    }

    let sidecars = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || e.file_name() == META_DIR)
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().is_file()
                && e.path().extension().is_some_and(|x| x == AssetKind::Combo.sidecar_extension())
        });

    let mut combos = Vec::new();
    for entry in sidecars {
        let parsed = fs::read_to_string(entry.path())
            .ok()
            .and_then(|text| serde_json::from_str::<ComboRef>(&text).ok());
        let name = parsed
            .as_ref()
            .and_then(|r| Path::new(&r.fbx).file_name())
            .map(|n| n.to_os_string());
        let dir = entry.path().parent().and_then(Path::parent);
        match (name, dir) {
            (Some(name), Some(dir)) => combos.push(relative_to(root, dir).join(name)),
            _ => log!("warn"; "skipping unreadable combo sidecar {}", entry.path().display()),
        }
    }
    combos
}
