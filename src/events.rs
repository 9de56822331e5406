use std::path::PathBuf;

use crate::pixels::Rgb;

/// The active wallpaper changed; carries the ranked palette sampled from it.
#[derive(Debug, Clone)]
pub struct WallpaperUpdate {
    pub path: PathBuf,
    pub colors: Vec<Rgb>,
}

/// Manual request to rotate immediately instead of waiting out the timer.
#[derive(Debug)]
pub struct Advance;
