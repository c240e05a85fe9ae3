//! Metadata store error types.

use super::types::AssetKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed sidecar `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Sidecar `{0}` has fields this version cannot read, fix it by hand")]
    Schema(PathBuf, #[source] serde_json::Error),

    #[error("`{0}` is neither an FBX model nor a combo JSON")]
    UnsupportedSource(PathBuf),

    #[error("Sidecar `{path}` holds {found} but its source is a {kind}")]
    KindMismatch {
        path: PathBuf,
        kind: AssetKind,
        found: &'static str,
    },

    #[error("`{0}` is not a mask")]
    NotAMask(String),

    #[error("`{0}` is not a combo")]
    NotACombo(String),

    #[error("Unknown or read-only field `{0}`")]
    UnknownField(String),

    #[error("Invalid value `{value}` for `{field}`")]
    InvalidValue { field: String, value: String },
}
