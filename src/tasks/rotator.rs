use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, JsonCatalog};
use crate::clustering;
use crate::config::Configuration;
use crate::error::Error;
use crate::events::{Advance, WallpaperUpdate};
use crate::pixels::Rgb;
use crate::selection;

/// How many picks to burn through when files turn out unreadable before
/// giving up on this rotation tick.
const MAX_PICK_ATTEMPTS: usize = 5;

pub type SharedCatalog = Arc<Mutex<JsonCatalog>>;

/// Drives the rotation: swap on the interval timer, or immediately on an
/// [`Advance`] command, and emit a [`WallpaperUpdate`] per swap.
///
/// Rules:
/// - A pick (choose + increment + normalize) runs as one transaction under
///   the catalog lock; decoding and clustering run outside it.
/// - A file that fails to decode is skipped and the pick retried; an empty
///   catalog is fatal and surfaces to the caller.
/// - Degenerate pixel data falls back to a black palette instead of
///   stalling rotation.
pub async fn run(
    cfg: Configuration,
    catalog: SharedCatalog,
    mut advance_rx: Receiver<Advance>,
    updates: Sender<WallpaperUpdate>,
    cancel: CancellationToken,
    increment: bool,
) -> Result<()> {
    let mut rng = StdRng::from_os_rng();

    // First wallpaper right away; later ones on the timer or on demand.
    rotate_once(&cfg, &catalog, &updates, &mut rng, increment).await?;

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting rotator");
                break;
            }

            _ = sleep(cfg.rotation.interval) => {
                rotate_once(&cfg, &catalog, &updates, &mut rng, increment).await?;
            }

            Some(Advance) = advance_rx.recv() => {
                debug!("manual advance requested");
                rotate_once(&cfg, &catalog, &updates, &mut rng, increment).await?;
            }
        }
    }

    Ok(())
}

async fn rotate_once(
    cfg: &Configuration,
    catalog: &SharedCatalog,
    updates: &Sender<WallpaperUpdate>,
    rng: &mut StdRng,
    increment: bool,
) -> Result<()> {
    for attempt in 1..=MAX_PICK_ATTEMPTS {
        let path = {
            let mut guard = catalog
                .lock()
                .map_err(|_| anyhow!("catalog lock poisoned"))?;
            selection::pick(&mut *guard, cfg.rotation.strategy, increment, rng)?
        };

        let cached = if cfg.palette.cache {
            let guard = catalog
                .lock()
                .map_err(|_| anyhow!("catalog lock poisoned"))?;
            guard.cached_colors(&path)
        } else {
            None
        };

        let colors = match cached {
            Some(colors) => {
                debug!(path = %path.display(), "using cached palette");
                colors
            }
            None => {
                let decode_path = path.clone();
                let palette_cfg = cfg.palette.clone();
                let mut worker_rng = StdRng::from_rng(rng);
                let outcome = tokio::task::spawn_blocking(move || -> Result<Vec<Rgb>, Error> {
                    let img = decode_rgba8(&decode_path)?;
                    Ok(clustering::extract_palette_or_black(
                        &img,
                        &palette_cfg,
                        &mut worker_rng,
                    ))
                })
                .await
                .context("palette worker panicked")?;
                match outcome {
                    Ok(colors) => colors,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, attempt, "unreadable image; picking again");
                        continue;
                    }
                }
            }
        };

        {
            let mut guard = catalog
                .lock()
                .map_err(|_| anyhow!("catalog lock poisoned"))?;
            if let Err(err) = guard.store_colors(&path, &colors) {
                // The record can vanish between the pick and here; not fatal.
                warn!(path = %path.display(), error = %err, "could not cache palette");
            }
            if let Err(err) = guard.save() {
                warn!(error = %err, "failed to persist catalog");
            }
        }

        let _ = updates.send(WallpaperUpdate { path, colors }).await;
        return Ok(());
    }

    warn!(attempts = MAX_PICK_ATTEMPTS, "no readable image found this tick");
    Ok(())
}

fn decode_rgba8(path: &Path) -> Result<RgbaImage, Error> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(img.to_rgba8())
}
