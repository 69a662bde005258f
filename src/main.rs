//! ThemeLens - headless theme browser
//!
//! Scans theme roots, renders one preview per complete theme and keeps
//! them in the preview cache. The engine is driven by a fixed-interval
//! timer the same way a UI frame clock would drive it.

mod event_bus;

use clap::Parser;
use lens_engine::{
    EngineCommand, EngineConfig, ResolutionEngine, SettingsStore, drain_events,
};
use lens_preview::{PreviewSize, Xcursor, export_frames};
use lens_themes::ThemeKind;
use log::{error, info, warn};
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "themelens")]
#[command(version, about = "Validate theme packages and cache their previews")]
struct Cli {
    /// Theme root to browse (repeatable). Defaults to every configured root.
    #[arg(long = "root", value_name = "PATH")]
    roots: Vec<PathBuf>,

    /// Preview size, `256` or `WxH`
    #[arg(long, value_parser = parse_size)]
    size: Option<PreviewSize>,

    /// Theme kind: icons or cursors
    #[arg(long)]
    kind: Option<ThemeKind>,

    /// Concurrent generations; more than one uses background workers
    #[arg(long)]
    jobs: Option<usize>,

    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,

    /// Settings file (default: ~/.config/themelens/settings.json)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Add a root to the saved root list
    #[arg(long, value_name = "PATH")]
    add_root: Option<PathBuf>,

    /// Remove a user-added root from the saved root list
    #[arg(long, value_name = "PATH")]
    remove_root: Option<PathBuf>,

    /// Generate a single theme's preview and print its cache path
    #[arg(long, value_name = "THEME")]
    once: Option<String>,

    /// Decode an Xcursor file and write its frames as PNG
    #[arg(long, value_name = "FILE", requires = "out")]
    extract_cursor: Option<PathBuf>,

    /// Output directory for --extract-cursor
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_size(s: &str) -> Result<PreviewSize, String> {
    PreviewSize::parse(s).ok_or_else(|| format!("invalid size '{}', expected 256 or WxH up to {}", s, PreviewSize::MAX_EDGE))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let (Some(file), Some(out)) = (&cli.extract_cursor, &cli.out) {
        return extract_cursor(file, out);
    }

    let store = SettingsStore::new(cli.settings.clone().unwrap_or_else(SettingsStore::default_path));
    let settings = store.load();

    // command-line overrides apply to this run only
    let mut config = EngineConfig::from_settings(&settings);
    if let Some(kind) = cli.kind {
        config = config.with_kind(kind);
    }
    if let Some(size) = cli.size {
        config = config.with_target_size(size);
    }
    if let Some(jobs) = cli.jobs {
        config = config.with_concurrency(jobs);
    }
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }

    let mut engine = ResolutionEngine::new(config).with_settings(settings, Some(store));

    if let Some(path) = cli.add_root.clone() {
        engine.handle(EngineCommand::AddRoot(path))?;
    }
    if let Some(path) = cli.remove_root.clone() {
        engine.handle(EngineCommand::RemoveRoot(path))?;
    }

    let roots: Vec<PathBuf> = if cli.roots.is_empty() {
        engine
            .roots()
            .iter()
            .map(|r| r.path.clone())
            .filter(|p| p.is_dir())
            .collect()
    } else {
        cli.roots.clone()
    };

    if roots.is_empty() {
        warn!("No theme roots to browse");
        return Ok(());
    }

    if let Some(theme) = &cli.once {
        return generate_once(&mut engine, &roots, theme);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(browse(engine, roots))
}

/// Walk the roots one at a time, ticking the engine until each is idle.
async fn browse(mut engine: ResolutionEngine, roots: Vec<PathBuf>) -> Result<(), Box<dyn Error>> {
    let events = engine.events();
    let mut interval = tokio::time::interval(event_bus::TICK_INTERVAL);

    for root in roots {
        println!("{}", root.display());
        engine.handle(EngineCommand::SetActiveDirectory(root))?;

        loop {
            interval.tick().await;
            engine.tick();
            for event in drain_events(&events) {
                println!("{}", event_bus::describe(&event));
            }
            if engine.is_idle() {
                break;
            }
        }
    }

    let stats = engine.stats();
    info!(
        "Done: {} scans, {} validated, {} rendered, {} cache hits, {} failed",
        stats.scans, stats.validations, stats.compositions, stats.cache_hits, stats.failures
    );
    Ok(())
}

fn generate_once(
    engine: &mut ResolutionEngine,
    roots: &[PathBuf],
    theme: &str,
) -> Result<(), Box<dyn Error>> {
    let size = engine.target_size();
    for root in roots {
        engine.set_active_directory(root);
        if !engine.themes().iter().any(|t| t.identity == theme) {
            continue;
        }
        let preview = engine.generate_blocking(theme, size)?;
        match &preview.cache_path {
            Some(path) => println!("{}", path.display()),
            None => warn!("{} rendered but could not be cached", theme),
        }
        return Ok(());
    }

    error!("No complete theme named {} in {} root(s)", theme, roots.len());
    Err(format!("theme not found: {}", theme).into())
}

fn extract_cursor(file: &Path, out: &Path) -> Result<(), Box<dyn Error>> {
    let cursor = Xcursor::open(file)?;
    let written = export_frames(&cursor, file, out)?;
    info!(
        "{}: {} frames, sizes {:?}",
        file.display(),
        written.len(),
        cursor.nominal_sizes()
    );
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
