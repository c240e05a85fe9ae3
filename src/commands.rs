//! Subcommand handlers.
//!
//! Every handler works on sources relative to the working copy root, which
//! is also the process working directory by the time they run.

use crate::{
    build::Builder,
    cli::{AdditionAction, ComboAction},
    config::ArtConfig,
    deps::{compute_dependencies, needs_rebuild},
    log,
    logger::ConsoleSink,
    maskmaker::MaskMaker,
    meta::{
        AssetKind, MetaStore, Metadata, additions::Addition, classify, find_combos, find_masks,
        health::missing_previews,
    },
    upload::{CliObjectStore, ObjectStore},
    utils::path::to_slash,
    vcs::{Svn, VersionControl},
};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// External collaborators for one run.
pub struct Session<'a> {
    pub config: &'a ArtConfig,
    pub tool: MaskMaker,
    pub vcs: Svn,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a ArtConfig) -> Self {
        Self {
            config,
            tool: MaskMaker::new(config.tools.maskmaker.clone()),
            vcs: Svn::new(config.tools.svn.clone(), config.root.clone()),
        }
    }

    fn store(&self) -> MetaStore<'_> {
        MetaStore::new(&self.vcs, &self.config.meta)
    }

    /// `source` as stored in sidecars: relative to the root, forward slashes.
    fn source(&self, source: &Path) -> PathBuf {
        let rel = source.strip_prefix(&self.config.root).unwrap_or(source);
        let rel = rel.strip_prefix(".").unwrap_or(rel);
        PathBuf::from(to_slash(rel))
    }

    fn load(&self, store: &MetaStore<'_>, source: &Path) -> Result<Metadata> {
        let source = self.source(source);
        store
            .load_or_create(&source)
            .with_context(|| format!("Failed to load metadata for `{}`", source.display()))
    }

    fn advise_commit(&self) {
        if self.vcs.needs_commit() {
            log!("svn"; "You have changed files in your depot. Be sure to commit your changes to avoid conflicts.");
        }
    }
}

// ============================================================================
// Inspection
// ============================================================================

pub fn list(session: &Session, filter: Option<&str>) -> Result<()> {
    let store = session.store();
    let root = Path::new(".");
    let sources = find_masks(root).into_iter().chain(find_combos(root));

    let mut shown = 0;
    for source in sources {
        let name = to_slash(&source);
        if filter.is_some_and(|f| !name.contains(f)) {
            continue;
        }
        let (status, kind) = store.classify_file(&source);
        let stale = match store.load(&source) {
            Ok(Some(meta)) if needs_rebuild(&meta) => " (stale)",
            _ => "",
        };
        log!("list"; "{:<11} {:<7} {}{}", status, kind, name, stale);
        shown += 1;
    }
    log!("list"; "{} asset(s)", shown);
    Ok(())
}

pub fn check(session: &Session, source: &Path) -> Result<()> {
    let store = session.store();
    let meta = session.load(&store, source)?;
    let (status, kind) = classify(&meta);

    log!("check"; "{} ({}, {})", meta.fbx, meta.kind, kind);
    log!("check"; "health: {}", status);
    log!("check"; "needs rebuild: {}", needs_rebuild(&meta));
    for preview in missing_previews(meta.source()) {
        log!("warn"; "missing preview {}", to_slash(&preview));
    }
    Ok(())
}

pub fn depends(session: &Session, source: &Path) -> Result<()> {
    let store = session.store();
    let meta = session.load(&store, source)?;
    let scan = compute_dependencies(&meta, &session.tool);

    for dep in &scan.dependencies {
        log!("depends"; "{} {:.0}", dep.file, dep.modtime);
    }
    for missing in &scan.missing {
        log!("warn"; "{} depends on {}, which cannot be found", meta.fbx, missing);
    }
    Ok(())
}

// ============================================================================
// Building
// ============================================================================

pub fn build(session: &Session, source: &Path) -> Result<()> {
    let store = session.store();
    let mut meta = session.load(&store, source)?;
    let builder = Builder::new(&session.tool, &session.vcs, &store, session.config.tools.morph_rest.clone());

    log!("build"; "{}", meta.fbx);
    let mut sink = ConsoleSink::new("maskmaker");
    let report = builder.build(&mut meta, &mut sink);

    for missing in &report.scan.missing {
        log!("warn"; "{} depends on {}, which cannot be found", meta.fbx, missing);
    }
    if report.failed_steps > 0 {
        log!("error"; "{} of the build steps failed, see the output above", report.failed_steps);
    } else {
        log!("build"; "done");
    }
    session.advise_commit();
    Ok(())
}

pub fn rebuild(session: &Session, force: bool) -> Result<()> {
    let store = session.store();
    let builder = Builder::new(&session.tool, &session.vcs, &store, session.config.tools.morph_rest.clone());

    let mut sink = ConsoleSink::new("maskmaker");
    let summary = builder.rebuild_all(Path::new("."), force, &mut sink);
    log!(
        "build";
        "{} built, {} up to date, {} with failed steps, {} unreadable",
        summary.built,
        summary.up_to_date,
        summary.failed,
        summary.unreadable
    );
    Ok(())
}

// ============================================================================
// Editing
// ============================================================================

pub fn set(session: &Session, source: &Path, field: &str, value: &str) -> Result<()> {
    let store = session.store();
    let mut meta = session.load(&store, source)?;
    meta.set_field(field, value)?;
    store.save(&mut meta)?;
    log!("meta"; "{}: {} = {}", meta.fbx, field, value);
    Ok(())
}

pub fn additions(session: &Session, source: &Path, action: &AdditionAction) -> Result<()> {
    let store = session.store();
    let mut meta = session.load(&store, source)?;

    let changed = match action {
        AdditionAction::List => {
            for (i, addn) in meta.addition_list().iter().enumerate() {
                log!("additions"; "{:>2}  {}", i, addn);
            }
            false
        }
        AdditionAction::Add { kind, name } => {
            let Some(addn) = Addition::new(kind, name) else {
                bail!("Unknown addition type `{kind}`");
            };
            meta.push_addition(addn)?;
            true
        }
        AdditionAction::Edit { index, key, value } => {
            if !meta.edit_addition(*index, key, value)? {
                bail!("No addition at index {index}");
            }
            true
        }
        AdditionAction::Remove { index } => meta.remove_addition(*index)?.is_some(),
        AdditionAction::Dup { index } => meta.duplicate_addition(*index)?,
        AdditionAction::Up { index } => meta.move_addition_up(*index)?,
        AdditionAction::Down { index } => meta.move_addition_down(*index)?,
        AdditionAction::Paste { from } => {
            let other = session.load(&store, from)?;
            meta.paste_additions(other.addition_list())?;
            !other.addition_list().is_empty()
        }
    };

    if changed {
        store.save(&mut meta)?;
        log!("additions"; "{} now has {} addition(s)", meta.fbx, meta.addition_list().len());
    } else if !matches!(action, AdditionAction::List) {
        log!("warn"; "nothing changed");
    }
    Ok(())
}

pub fn combo(session: &Session, action: &ComboAction) -> Result<()> {
    let store = session.store();
    match action {
        ComboAction::New { source } => {
            let meta = store.new_combo(&session.source(source))?;
            log!("combo"; "{} ({})", meta.fbx, meta.uuid);
        }
        ComboAction::Part { source, slot, mask } => {
            let mask = if mask.is_empty() {
                String::new()
            } else {
                let mask = session.source(Path::new(mask));
                if AssetKind::from_source(&mask) != Some(AssetKind::Mask) {
                    bail!("`{}` is not an FBX mask", mask.display());
                }
                to_slash(&mask)
            };
            let mut meta = session.load(&store, source)?;
            meta.set_part(*slot, &mask)?;
            store.save(&mut meta)?;
            log!("combo"; "{} parts: {}", meta.fbx, meta.parts().join(", "));
        }
    }
    Ok(())
}

// ============================================================================
// Repository and release
// ============================================================================

pub fn sync(session: &Session, update: bool) -> Result<()> {
    if !session.vcs.needs_update() {
        log!("svn"; "working copy is up to date");
        session.advise_commit();
        return Ok(());
    }
    if !update {
        log!("warn"; "working copy is out of date, run `arttool sync --update`");
        return Ok(());
    }

    let mut sink = ConsoleSink::new("svn");
    let report = session.vcs.update(&mut sink);
    if !report.success {
        bail!("svn update failed");
    }
    log!("svn"; "{} path(s) updated", report.changed.len());

    let config_name = session.config.config_path.file_name();
    if report
        .changed
        .iter()
        .any(|p| Path::new(p).file_name() == config_name)
    {
        log!("warn"; "the configuration changed, run arttool again to pick it up");
    }
    Ok(())
}

pub fn upload(session: &Session, file: &Path, key: Option<&str>) -> Result<()> {
    let key = match key {
        Some(key) => key.to_owned(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Upload source has no file name")?,
    };
    CliObjectStore::new(&session.config.upload).upload(file, &key)?;
    log!("upload"; "done");
    Ok(())
}
