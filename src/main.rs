//! Binary entrypoint for wallshift.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use wallshift::catalog::JsonCatalog;
use wallshift::events::{Advance, WallpaperUpdate};
use wallshift::selection::Strategy;
use wallshift::tasks::rotator;
use wallshift::{config, scan};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "wallshift", about = "Catalog-driven wallpaper rotator")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "wallshift.yaml")]
    config: PathBuf,

    /// Override the rotation interval (e.g. "90s", "5m")
    #[arg(long, value_name = "DURATION")]
    interval: Option<String>,

    /// Override the selection strategy (uniform, usage-weighted, least-used)
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<String>,

    /// Rotate a single time and exit
    #[arg(long)]
    once: bool,

    /// Preview mode: pick without counting it against usage; implies --once
    #[arg(long)]
    preview: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("wallshift={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn palette_hex(colors: &[[u8; 3]]) -> String {
    colors
        .iter()
        .map(|c| format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = config::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(raw) = &cli.interval {
        cfg.rotation.interval =
            humantime::parse_duration(raw).context("parsing --interval override")?;
    }
    if let Some(raw) = &cli.strategy {
        cfg.rotation.strategy = raw.parse::<Strategy>()?;
    }
    cfg.validate().context("validating configuration")?;

    let mut catalog = JsonCatalog::open(&cfg.catalog)
        .with_context(|| format!("opening catalog {}", cfg.catalog.display()))?;
    let discovered = scan::refresh_catalog(&mut catalog);
    info!(records = catalog.len(), discovered, "catalog ready");
    catalog.save().context("persisting catalog")?;

    let catalog = Arc::new(Mutex::new(catalog));
    let (advance_tx, advance_rx) = mpsc::channel::<Advance>(4);
    let (update_tx, mut update_rx) = mpsc::channel::<WallpaperUpdate>(4);
    let cancel = CancellationToken::new();

    let rotator = tokio::spawn(rotator::run(
        cfg,
        catalog,
        advance_rx,
        update_tx,
        cancel.clone(),
        !cli.preview,
    ));
    // Held open so embedders and future keybind glue can trigger rotations.
    let _advance_tx = advance_tx;

    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received; shutting down");
                break;
            }

            maybe_update = update_rx.recv() => match maybe_update {
                Some(WallpaperUpdate { path, colors }) => {
                    // The OS-specific "set desktop background" call is the
                    // surrounding platform glue's job; we publish the result.
                    info!(path = %path.display(), palette = %palette_hex(&colors), "wallpaper changed");
                    if cli.once || cli.preview {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    cancel.cancel();
    rotator.await.context("joining rotator task")??;
    Ok(())
}
