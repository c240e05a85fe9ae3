//! Release readiness of a record.

use super::types::{AssetKind, Metadata};
use crate::utils::path::lowercase_sibling;
use std::{fmt, path::Path};

/// Preview files expected next to every source, lowercased.
pub const PREVIEW_EXTENSIONS: [&str; 3] = ["gif", "png", "mp4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Good,
    Error,
    Warning,
    NoRelease,
    WithPlugin,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Good => "good",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::NoRelease => "no-release",
            Self::WithPlugin => "with-plugin",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Unknown,
    Normal,
    Morph,
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Normal => "normal",
            Self::Morph => "morph",
        })
    }
}

fn required_fields(meta: &Metadata, kind: AssetKind) -> Vec<&str> {
    let mut fields = vec![meta.name.as_str(), meta.license.as_str(), meta.description.as_str()];
    if kind == AssetKind::Mask {
        fields.push(meta.author.as_str());
    }
    fields
}

/// Previews of `source` that do not exist on disk.
pub fn missing_previews(source: &Path) -> Vec<std::path::PathBuf> {
    PREVIEW_EXTENSIONS
        .iter()
        .map(|ext| lowercase_sibling(source, ext))
        .filter(|p| !p.exists())
        .collect()
}

/// First match wins:
/// no `is_morph` key, `do_not_release`, empty required field, empty website,
/// missing preview, `release_with_plugin`, otherwise good.
pub fn classify(meta: &Metadata) -> (HealthStatus, MaskKind) {
    let Some(is_morph) = meta.is_morph else {
        return (HealthStatus::Error, MaskKind::Unknown);
    };
    let mask_kind = if is_morph { MaskKind::Morph } else { MaskKind::Normal };

    let status = if meta.do_not_release {
        HealthStatus::NoRelease
    } else if required_fields(meta, meta.kind).iter().any(|f| f.is_empty()) {
        HealthStatus::Error
    } else if meta.website.is_empty() || !missing_previews(meta.source()).is_empty() {
        HealthStatus::Warning
    } else if meta.release_with_plugin {
        HealthStatus::WithPlugin
    } else {
        HealthStatus::Good
    };

    (status, mask_kind)
}
