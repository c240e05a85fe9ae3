//! arttool - metadata, build and release tool for face-mask art assets.

mod build;
mod cli;
mod commands;
mod config;
mod deps;
mod logger;
mod maskmaker;
mod meta;
mod upload;
mod utils;
mod vcs;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use config::{ArtConfig, WindowConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let window_path = WindowConfig::default_path();
    let window = window_path
        .as_deref()
        .map(WindowConfig::load)
        .unwrap_or_default();

    let session = Session::new(&config);
    let result = run(&session, &cli.command);

    if let Some(path) = &window_path
        && let Err(e) = window.save(path)
    {
        log!("warn"; "{}", e);
    }
    result
}

fn run(session: &Session, command: &Commands) -> Result<()> {
    match command {
        Commands::List { filter } => commands::list(session, filter.as_deref()),
        Commands::Check { source } => commands::check(session, source),
        Commands::Depends { source } => commands::depends(session, source),
        Commands::Build { source } => commands::build(session, source),
        Commands::Rebuild { force } => commands::rebuild(session, *force),
        Commands::Set { source, field, value } => commands::set(session, source, field, value),
        Commands::Additions { source, action } => commands::additions(session, source, action),
        Commands::Combo { action } => commands::combo(session, action),
        Commands::Sync { update } => commands::sync(session, *update),
        Commands::Upload { file, key } => commands::upload(session, file, key.as_deref()),
    }
}

/// Load configuration, enter the root, then validate it from there
fn load_config(cli: &Cli) -> Result<ArtConfig> {
    let config = ArtConfig::load(cli)?;

    // Sidecars store sources relative to the root
    std::env::set_current_dir(&config.root)
        .with_context(|| format!("Cannot enter working copy `{}`", config.root.display()))?;

    config.validate()?;
    Ok(config)
}
