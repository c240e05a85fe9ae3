//! Release uploads to object storage.
//!
//! Uploads go through an S3-compatible command line client configured in
//! `[upload]`, invoked as:
//!
//! ```text
//! <command...> <file> s3://<bucket>/<prefix><key> --acl public-read --content-type <type>
//! ```

use crate::{config::UploadConfig, exec, log};
use anyhow::{Result, bail};
use std::path::Path;

/// MIME type for an uploaded file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("gif") => "image/gif",
        Some("png") => "image/png",
        Some("mp4") => "video/mp4",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

pub trait ObjectStore {
    /// Upload `local` under `key`, publicly readable.
    fn upload(&self, local: &Path, key: &str) -> Result<()>;
}

pub struct CliObjectStore<'a> {
    config: &'a UploadConfig,
}

impl<'a> CliObjectStore<'a> {
    pub const fn new(config: &'a UploadConfig) -> Self {
        Self { config }
    }

    /// Remote URL for `key`.
    pub fn url(&self, key: &str) -> String {
        format!("s3://{}/{}{}", self.config.bucket, self.config.prefix, key)
    }
}

impl ObjectStore for CliObjectStore<'_> {
    fn upload(&self, local: &Path, key: &str) -> Result<()> {
        if self.config.bucket.is_empty() {
            bail!("No upload bucket configured, set `[upload] bucket`");
        }
        if !local.is_file() {
            bail!("Upload source `{}` does not exist", local.display());
        }

        let url = self.url(key);
        let content_type = content_type_for(local);
        log!("upload"; "{} -> {} ({})", local.display(), url, content_type);

        let outcome = exec!(
            &self.config.command;
            local,
            &url,
            "--acl",
            "public-read",
            "--content-type",
            content_type
        )?;

        for line in &outcome.lines {
            log!("upload"; "{}", line);
        }
        if !outcome.success {
            bail!("{}", crate::utils::exec::failure_line(&outcome.program));
        }
        Ok(())
    }
}
