//! `[tools]`, `[meta]` and `[upload]` sections.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[tools]` section - external programs.
///
/// Commands are vectors; the first element is the binary and the rest are
/// fixed leading arguments.
///
/// # Example
/// ```toml
/// [tools]
/// maskmaker = ["~/bin/maskmaker"]
/// svn = ["svn", "--non-interactive"]
/// morph_rest = "morphs/morph_rest.fbx"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    #[serde(default = "defaults::tools::maskmaker")]
    #[educe(Default = defaults::tools::maskmaker())]
    pub maskmaker: Vec<String>,

    #[serde(default = "defaults::tools::svn")]
    #[educe(Default = defaults::tools::svn())]
    pub svn: Vec<String>,

    /// Rest pose FBX every morph mask is imported against, relative to root.
    #[serde(default = "defaults::tools::morph_rest")]
    #[educe(Default = defaults::tools::morph_rest())]
    pub morph_rest: PathBuf,
}

/// `[meta]` section - values for newly created sidecars.
///
/// `license` is also forced onto every record when it is loaded.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    #[serde(default = "defaults::meta::license")]
    #[educe(Default = defaults::meta::license())]
    pub license: String,

    #[serde(default = "defaults::meta::website")]
    #[educe(Default = defaults::meta::website())]
    pub website: String,

    #[serde(default = "defaults::meta::author")]
    #[educe(Default = defaults::meta::author())]
    pub author: String,
}

/// `[upload]` section - release object storage.
///
/// # Example
/// ```toml
/// [upload]
/// command = ["aws", "s3", "cp"]
/// bucket = "mask-releases"
/// prefix = "masks/"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    #[serde(default = "defaults::upload::command")]
    #[educe(Default = defaults::upload::command())]
    pub command: Vec<String>,

    #[serde(default = "defaults::upload::bucket")]
    #[educe(Default = defaults::upload::bucket())]
    pub bucket: String,

    /// Prepended to every key, include a trailing `/` for a folder
    #[serde(default = "defaults::upload::prefix")]
    #[educe(Default = defaults::upload::prefix())]
    pub prefix: String,
}
