//! Build orchestration.
//!
//! A build is a fixed sequence of blocking maskmaker invocations against the
//! derived JSON. A failed step is reported in the output sink and the next
//! step runs anyway; nothing is rolled back.
//!
//! # Mask
//!
//! 1. Scan and record dependencies in the sidecar
//! 2. `import` / `morphimport`
//! 3. Stage the derived JSON with version control
//! 4. Depth head resources, when `depth_head` is set
//! 5. One invocation per addition, in list order
//!
//! # Combo
//!
//! 1. Scan and record dependencies in the sidecar
//! 2. `merge <part json...> <combo json>`
//! 3. Stage the combo JSON

pub mod steps;

use crate::{
    deps::{DependencyScan, compute_dependencies, derived_json, needs_rebuild},
    log,
    logger::OutputSink,
    maskmaker::{AssetTool, ToolArgs},
    meta::{AssetKind, MetaStore, Metadata, find_combos, find_masks},
    utils::path::json_from_source,
    vcs::VersionControl,
};
use std::path::{Path, PathBuf};

/// Outcome of one asset build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub scan: DependencyScan,
    /// Invocations that exited unsuccessfully
    pub failed_steps: usize,
}

/// Counts from [`Builder::rebuild_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub built: usize,
    pub up_to_date: usize,
    /// Built, but with at least one failed step
    pub failed: usize,
    /// Sidecars that could not be loaded
    pub unreadable: usize,
}

pub struct Builder<'a> {
    tool: &'a dyn AssetTool,
    vcs: &'a dyn VersionControl,
    store: &'a MetaStore<'a>,
    morph_rest: PathBuf,
}

impl<'a> Builder<'a> {
    pub fn new(
        tool: &'a dyn AssetTool,
        vcs: &'a dyn VersionControl,
        store: &'a MetaStore<'a>,
        morph_rest: PathBuf,
    ) -> Self {
        Self {
            tool,
            vcs,
            store,
            morph_rest,
        }
    }

    /// Build `meta` according to its kind.
    pub fn build(&self, meta: &mut Metadata, sink: &mut dyn OutputSink) -> BuildReport {
        match meta.kind {
            AssetKind::Mask => self.build_mask(meta, sink),
            AssetKind::Combo => self.build_combo(meta, sink),
        }
    }

    pub fn build_mask(&self, meta: &mut Metadata, sink: &mut dyn OutputSink) -> BuildReport {
        let scan = self.record_dependencies(meta);
        let json = derived_json(meta);
        let target = [json.clone()];
        let mut failed_steps = 0;
        let mut step = |command: &str, args: &ToolArgs, sink: &mut dyn OutputSink| {
            if !self.tool.run(command, args, &target, sink) {
                failed_steps += 1;
            }
        };

        let (command, args) = steps::import(meta, &self.morph_rest);
        step(command, &args, sink);

        self.vcs.add_if_untracked(&json);

        if meta.depth_head {
            for (command, args) in steps::depth_head() {
                step(command, &args, sink);
            }
        }

        for addn in meta.addition_list() {
            let (command, args) = steps::addition(addn);
            step(command, &args, sink);
        }

        BuildReport { scan, failed_steps }
    }

    pub fn build_combo(&self, meta: &mut Metadata, sink: &mut dyn OutputSink) -> BuildReport {
        let scan = self.record_dependencies(meta);
        let json = derived_json(meta);

        let mut files: Vec<PathBuf> = meta
            .parts()
            .into_iter()
            .map(|part| json_from_source(Path::new(part)))
            .collect();
        files.push(json.clone());

        let ok = self.tool.run("merge", &ToolArgs::new(), &files, sink);
        self.vcs.add_if_untracked(&json);

        BuildReport {
            scan,
            failed_steps: usize::from(!ok),
        }
    }

    /// Rebuild every stale asset under `root`, masks before combos so merges
    /// see fresh parts. `force` rebuilds everything.
    pub fn rebuild_all(&self, root: &Path, force: bool, sink: &mut dyn OutputSink) -> RebuildSummary {
        let mut summary = RebuildSummary::default();
        let sources = find_masks(root).into_iter().chain(find_combos(root));

        for source in sources {
            // Keep sources relative when running from the root itself
            let source = if root == Path::new(".") { source } else { root.join(source) };
            let mut meta = match self.store.load_or_create(&source) {
                Ok(meta) => meta,
                Err(e) => {
                    log!("error"; "{:#}", anyhow::Error::from(e));
                    summary.unreadable += 1;
                    continue;
                }
            };

            if !force && !needs_rebuild(&meta) {
                summary.up_to_date += 1;
                continue;
            }

            log!("build"; "{}", meta.fbx);
            let report = self.build(&mut meta, sink);
            summary.built += 1;
            if report.failed_steps > 0 {
                summary.failed += 1;
            }
            for missing in &report.scan.missing {
                log!("warn"; "{} depends on {}, which cannot be found", meta.fbx, missing);
            }
        }

        if self.vcs.needs_commit() {
            log!("svn"; "You have changed files in your depot. Be sure to commit your changes to avoid conflicts.");
        }
        summary
    }

    /// Scan dependencies and persist them before anything is built, so a
    /// failed build still records what it attempted.
    fn record_dependencies(&self, meta: &mut Metadata) -> DependencyScan {
        let scan = compute_dependencies(meta, self.tool);
        meta.dependencies.clone_from(&scan.dependencies);
        if let Err(e) = self.store.save(meta) {
            log!("error"; "{:#}", anyhow::Error::from(e));
        }
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MetaConfig,
        meta::additions::Addition,
        utils::{exec::failure_line, path::to_slash},
        vcs::fake::FakeVcs,
    };
    use std::{cell::RefCell, fs};
    use tempfile::TempDir;

    /// Records invocations; `import`, `morphimport` and `merge` write their
    /// target JSON. Commands listed in `failing` exit unsuccessfully.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, ToolArgs, Vec<PathBuf>)>>,
        depends: Vec<&'static str>,
        failing: Vec<&'static str>,
    }

    impl Recorder {
        fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(c, ..)| c.clone()).collect()
        }
    }

    impl AssetTool for Recorder {
        fn run(&self, command: &str, args: &ToolArgs, files: &[PathBuf], sink: &mut dyn OutputSink) -> bool {
            self.calls
                .borrow_mut()
                .push((command.to_owned(), args.clone(), files.to_vec()));
            if self.failing.contains(&command) {
                sink.append(&failure_line("maskmaker"));
                return false;
            }
            if matches!(command, "import" | "morphimport" | "merge") {
                if let Some(target) = files.last() {
                    fs::write(target, b"{}").unwrap();
                }
            }
            sink.append("Done!");
            true
        }

        fn depends(&self, _: &Path) -> Vec<String> {
            self.depends.iter().map(|s| (*s).to_owned()).collect()
        }
    }

    struct Fixture {
        dir: TempDir,
        vcs: FakeVcs,
        config: MetaConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                vcs: FakeVcs::default(),
                config: MetaConfig::default(),
            }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn write(&self, rel: &str) -> PathBuf {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"x").unwrap();
            path
        }
    }

    #[test]
    fn test_build_mask_runs_steps_in_order() {
        let fx = Fixture::new();
        let source = fx.write("masks/hat.fbx");
        fx.write("masks/tex.png");
        let store = MetaStore::new(&fx.vcs, &fx.config);
        let tool = Recorder {
            depends: vec!["tex.png", "missing.png"],
            ..Default::default()
        };
        let builder = Builder::new(&tool, &fx.vcs, &store, PathBuf::from("rest.fbx"));

        let mut meta = store.load_or_create(&source).unwrap();
        meta.depth_head = true;
        meta.push_addition(Addition::new("image", "hat_png").unwrap()).unwrap();
        meta.push_addition(Addition::new("tweak", "speed").unwrap()).unwrap();

        let mut sink: Vec<String> = Vec::new();
        let report = builder.build(&mut meta, &mut sink);

        assert_eq!(
            tool.commands(),
            ["import", "addres", "addres", "addpart", "addres", "tweak"]
        );
        let json = fx.path("masks/hat.json");
        assert!(tool.calls.borrow().iter().all(|(_, _, files)| files == &[json.clone()]));
        assert_eq!(report.failed_steps, 0);
        assert_eq!(sink.len(), 6);

        assert_eq!(report.scan.dependencies.len(), 3);
        assert_eq!(report.scan.missing, vec![format!("{}/missing.png", to_slash(&fx.path("masks")))]);
        assert!(fx.vcs.added.borrow().contains(&json));

        let saved = store.load(&source).unwrap().unwrap();
        let files = |deps: &[crate::meta::Dependency]| deps.iter().map(|d| d.file.clone()).collect::<Vec<_>>();
        assert_eq!(files(&saved.dependencies), files(&report.scan.dependencies));
    }

    #[test]
    fn test_failed_step_does_not_stop_build() {
        let fx = Fixture::new();
        let source = fx.write("hat.fbx");
        let store = MetaStore::new(&fx.vcs, &fx.config);
        let tool = Recorder {
            failing: vec!["addres"],
            ..Default::default()
        };
        let builder = Builder::new(&tool, &fx.vcs, &store, PathBuf::from("rest.fbx"));

        let mut meta = store.load_or_create(&source).unwrap();
        meta.depth_head = true;
        let mut sink: Vec<String> = Vec::new();
        let report = builder.build(&mut meta, &mut sink);

        assert_eq!(tool.commands(), ["import", "addres", "addres", "addpart"]);
        assert_eq!(report.failed_steps, 2);
        assert_eq!(
            sink.iter().filter(|l| l.starts_with("ERROR maskmaker")).count(),
            2
        );
    }

    #[test]
    fn test_morph_mask_uses_rest_file() {
        let fx = Fixture::new();
        let source = fx.write("face.fbx");
        let store = MetaStore::new(&fx.vcs, &fx.config);
        let tool = Recorder::default();
        let builder = Builder::new(&tool, &fx.vcs, &store, PathBuf::from("/art/rest.fbx"));

        let mut meta = store.load_or_create(&source).unwrap();
        meta.is_morph = Some(true);
        builder.build(&mut meta, &mut Vec::new());

        let calls = tool.calls.borrow();
        assert_eq!(calls[0].0, "morphimport");
        assert!(calls[0].1.contains("restfile"));
    }

    #[test]
    fn test_build_combo_merges_parts_then_combo() {
        let fx = Fixture::new();
        let combo = fx.path("duo.json");
        let store = MetaStore::new(&fx.vcs, &fx.config);
        let tool = Recorder::default();
        let builder = Builder::new(&tool, &fx.vcs, &store, PathBuf::from("rest.fbx"));

        let hat = to_slash(&fx.path("masks/hat.fbx"));
        let beard = to_slash(&fx.path("masks/beard.fbx"));
        fx.write("masks/hat.json");

        let mut meta = store.new_combo(&combo).unwrap();
        meta.set_part(0, &hat).unwrap();
        meta.set_part(5, &beard).unwrap();

        let report = builder.build(&mut meta, &mut Vec::new());
        let calls = tool.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "merge");
        assert_eq!(
            calls[0].2,
            vec![fx.path("masks/hat.json"), fx.path("masks/beard.json"), combo.clone()]
        );
        assert_eq!(report.scan.missing.len(), 1);
        assert!(combo.exists());
    }

    #[test]
    fn test_rebuild_all_is_idempotent() {
        let fx = Fixture::new();
        fx.write("masks/hat.fbx");
        fx.write("masks/beard.fbx");
        let store = MetaStore::new(&fx.vcs, &fx.config);
        let tool = Recorder::default();
        let builder = Builder::new(&tool, &fx.vcs, &store, PathBuf::from("rest.fbx"));

        let first = builder.rebuild_all(fx.dir.path(), false, &mut Vec::new());
        assert_eq!(first.built, 2);
        assert_eq!(first.up_to_date, 0);

        let second = builder.rebuild_all(fx.dir.path(), false, &mut Vec::new());
        assert_eq!(second.built, 0);
        assert_eq!(second.up_to_date, 2);

        let forced = builder.rebuild_all(fx.dir.path(), true, &mut Vec::new());
        assert_eq!(forced.built, 2);
    }
}
