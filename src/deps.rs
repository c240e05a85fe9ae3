//! Build inputs and staleness of derived JSON assets.
//!
//! A mask's inputs are its FBX plus whatever maskmaker reports the FBX
//! references (textures, mostly). A combo's inputs are the derived JSON of
//! each mask in its part slots. Recorded inputs live in the sidecar's
//! `dependencies` list and are overwritten wholesale at every build.

use crate::{
    maskmaker::AssetTool,
    meta::{AssetKind, Dependency, Metadata, sidecar_path},
    utils::path::{json_from_source, modified, modtime_secs, to_slash},
};
use std::path::{Path, PathBuf};

/// Collapse the first `..` segment (after the first segment) together with
/// the segment before it. Separators may be `/` or `\`; output uses `/`.
///
/// Only one `..` is collapsed: `a/b/../c` becomes `a/c`.
pub fn collapse_path(path: &str) -> String {
    let mut bits: Vec<&str> = path.split(['/', '\\']).collect();
    if let Some(i) = bits.iter().skip(1).position(|b| *b == "..").map(|i| i + 1) {
        bits.drain(i - 1..=i);
    }
    bits.join("/")
}

/// Absolute path of the JSON a record builds into. A combo's source is
/// already its JSON.
pub fn derived_json(meta: &Metadata) -> PathBuf {
    json_from_source(meta.source())
}

/// Result of a dependency scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyScan {
    pub dependencies: Vec<Dependency>,
    /// Dependencies that could not be found on disk
    pub missing: Vec<String>,
}

impl DependencyScan {
    fn record(&mut self, file: String, exists: bool) {
        let modtime = if exists { modtime_secs(Path::new(&file)) } else { 0.0 };
        if !exists {
            self.missing.push(file.clone());
        }
        self.dependencies.push(Dependency { file, modtime });
    }
}

/// Current inputs of `meta`, with their modification times.
pub fn compute_dependencies(meta: &Metadata, tool: &dyn AssetTool) -> DependencyScan {
    match meta.kind {
        AssetKind::Mask => mask_dependencies(meta, tool),
        AssetKind::Combo => combo_dependencies(meta),
    }
}

fn mask_dependencies(meta: &Metadata, tool: &dyn AssetTool) -> DependencyScan {
    let source = meta.source();
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let mut scan = DependencyScan::default();

    scan.record(meta.fbx.clone(), source.exists());

    for dep in tool.depends(source) {
        let dep = dep.trim();
        if dep.is_empty() {
            continue;
        }

        let file = collapse_path(&to_slash(&dir.join(dep)));
        if Path::new(&file).exists() {
            scan.record(file, true);
            continue;
        }

        // Textures are often moved next to the FBX after export
        let relocated = Path::new(&file)
            .file_name()
            .map(|name| to_slash(&dir.join(name)));
        match relocated {
            Some(moved) if Path::new(&moved).exists() => scan.record(moved, true),
            _ => scan.record(file, false),
        }
    }

    scan
}

fn combo_dependencies(meta: &Metadata) -> DependencyScan {
    let mut scan = DependencyScan::default();
    for part in meta.parts() {
        let json = to_slash(&json_from_source(Path::new(part)));
        let exists = Path::new(&json).exists();
        scan.record(json, exists);
    }
    scan
}

/// Whether the derived JSON of `meta` must be rebuilt.
///
/// True when the JSON is missing, or when the source, the sidecar or any
/// recorded dependency is newer than it. A recorded dependency that no
/// longer exists also forces a rebuild. Everything is re-read on each call.
pub fn needs_rebuild(meta: &Metadata) -> bool {
    let Some(built) = modified(&derived_json(meta)) else {
        return true;
    };
    let newer = |path: &Path| modified(path).is_some_and(|t| t > built);

    if newer(meta.source()) || newer(&sidecar_path(meta.source(), meta.kind)) {
        return true;
    }

    meta.dependencies.iter().any(|dep| {
        let path = Path::new(&dep.file);
        !path.exists() || newer(path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{logger::OutputSink, maskmaker::ToolArgs};
    use std::{
        fs::{self, File},
        time::{Duration, SystemTime},
    };
    use tempfile::TempDir;

    /// Reports a fixed list of dependencies.
    struct Depends(Vec<&'static str>);

    impl AssetTool for Depends {
        fn run(&self, _: &str, _: &ToolArgs, _: &[PathBuf], _: &mut dyn OutputSink) -> bool {
            true
        }
        fn depends(&self, _: &Path) -> Vec<String> {
            self.0.iter().map(|s| (*s).to_owned()).collect()
        }
    }

    fn touch(path: &Path, secs_ago: u64) {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        if !path.exists() {
            fs::write(path, b"x").unwrap();
        }
        let when = SystemTime::now() - Duration::from_secs(secs_ago);
        File::options().write(true).open(path).unwrap().set_modified(when).unwrap();
    }

    fn mask_at(dir: &TempDir) -> Metadata {
        let source = dir.path().join("masks/hat.fbx");
        Metadata::new(&to_slash(&source), AssetKind::Mask)
    }

    #[test]
    fn test_collapse_path_single_parent() {
        assert_eq!(collapse_path("a/b/../c"), "a/c");
        assert_eq!(collapse_path("a\\b\\..\\c"), "a/c");
    }

    #[test]
    fn test_collapse_path_only_first_parent() {
        assert_eq!(collapse_path("a/b/../../c"), "a/../c");
        assert_eq!(collapse_path("../a"), "../a");
        assert_eq!(collapse_path("a/b/c"), "a/b/c");
    }

    #[test]
    fn test_mask_dependencies_resolve_and_relocate() {
        let dir = TempDir::new().unwrap();
        let meta = mask_at(&dir);
        touch(meta.source(), 100);
        touch(&dir.path().join("textures/skin.png"), 100);
        touch(&dir.path().join("masks/eyes.png"), 100);

        let tool = Depends(vec!["../textures/skin.png", "old/place/eyes.png", "", "gone.png"]);
        let scan = compute_dependencies(&meta, &tool);

        let files: Vec<_> = scan.dependencies.iter().map(|d| d.file.as_str()).collect();
        let root = to_slash(dir.path());
        assert_eq!(
            files,
            vec![
                meta.fbx.clone(),
                format!("{root}/textures/skin.png"),
                format!("{root}/masks/eyes.png"),
                format!("{root}/masks/gone.png"),
            ]
        );
        assert!(scan.dependencies[..3].iter().all(|d| d.modtime > 0.0));
        assert_eq!(scan.dependencies[3].modtime, 0.0);
        assert_eq!(scan.missing, vec![format!("{root}/masks/gone.png")]);
    }

    #[test]
    fn test_combo_dependencies_map_parts_to_json() {
        let dir = TempDir::new().unwrap();
        let root = to_slash(dir.path());
        touch(&dir.path().join("masks/hat.json"), 10);

        let mut meta = Metadata::new(&format!("{root}/duo.json"), AssetKind::Combo);
        meta.set_part(0, &format!("{root}/masks/hat.fbx")).unwrap();
        meta.set_part(3, &format!("{root}/masks/beard.FBX")).unwrap();

        let scan = compute_dependencies(&meta, &Depends(vec!["ignored.png"]));
        assert_eq!(scan.dependencies.len(), 2);
        assert_eq!(scan.dependencies[0].file, format!("{root}/masks/hat.json"));
        assert!(scan.dependencies[0].modtime > 0.0);
        assert_eq!(scan.missing, vec![format!("{root}/masks/beard.json")]);
    }

    #[test]
    fn test_needs_rebuild_when_json_missing() {
        let dir = TempDir::new().unwrap();
        let meta = mask_at(&dir);
        touch(meta.source(), 100);
        assert!(needs_rebuild(&meta));
    }

    #[test]
    fn test_fresh_json_is_up_to_date_and_stays_so() {
        let dir = TempDir::new().unwrap();
        let mut meta = mask_at(&dir);
        touch(meta.source(), 100);
        touch(&dir.path().join("masks/.art/hat.meta"), 100);
        touch(&dir.path().join("masks/tex.png"), 100);
        touch(&dir.path().join("masks/hat.json"), 10);
        meta.dependencies = compute_dependencies(&meta, &Depends(vec!["tex.png"])).dependencies;

        assert!(!needs_rebuild(&meta));
        assert!(!needs_rebuild(&meta));
    }

    #[test]
    fn test_newer_source_or_sidecar_forces_rebuild() {
        let dir = TempDir::new().unwrap();
        let meta = mask_at(&dir);
        touch(meta.source(), 100);
        touch(&dir.path().join("masks/hat.json"), 50);
        assert!(!needs_rebuild(&meta));

        touch(&dir.path().join("masks/.art/hat.meta"), 5);
        assert!(needs_rebuild(&meta));

        touch(&dir.path().join("masks/.art/hat.meta"), 100);
        touch(meta.source(), 5);
        assert!(needs_rebuild(&meta));
    }

    #[test]
    fn test_newer_dependency_forces_rebuild() {
        let dir = TempDir::new().unwrap();
        let mut meta = mask_at(&dir);
        let tex = dir.path().join("masks/tex.png");
        touch(meta.source(), 100);
        touch(&tex, 100);
        touch(&dir.path().join("masks/hat.json"), 50);
        meta.dependencies = vec![Dependency {
            file: to_slash(&tex),
            modtime: modtime_secs(&tex),
        }];
        assert!(!needs_rebuild(&meta));

        touch(&tex, 5);
        assert!(needs_rebuild(&meta));
    }

    #[test]
    fn test_vanished_dependency_forces_rebuild() {
        let dir = TempDir::new().unwrap();
        let mut meta = mask_at(&dir);
        touch(meta.source(), 100);
        touch(&dir.path().join("masks/hat.json"), 50);
        meta.dependencies = vec![Dependency {
            file: to_slash(&dir.path().join("masks/gone.png")),
            modtime: 0.0,
        }];
        assert!(needs_rebuild(&meta));
    }
}
