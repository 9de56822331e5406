//! Dominant-color clustering over flattened pixel data.
//!
//! Two interchangeable algorithms sit behind the [`ColorCluster`] trait:
//! a pruning K-means variant and a point-removal Mean-Shift variant. Both
//! are pure, synchronous routines; callers run them on a worker when the
//! UI thread must stay responsive.

pub mod kmeans;
pub mod mean_shift;

pub use kmeans::KMeans;
pub use mean_shift::MeanShift;

use image::RgbaImage;
use rand::RngCore;
use serde::Deserialize;
use tracing::warn;

use crate::config::PaletteConfig;
use crate::error::Error;
use crate::pixels::{self, Rgb};

/// A representative color with the number of pixels that backed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterColor {
    pub rgb: Rgb,
    pub weight: usize,
}

/// Capability shared by the clustering algorithms: reduce a pixel
/// population to a weight-ranked list of representative colors.
pub trait ColorCluster {
    fn cluster(&self, pixels: &[Rgb], rng: &mut dyn RngCore) -> Result<Vec<ClusterColor>, Error>;
}

/// Tagged algorithm choice, straight from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClusterAlgorithm {
    Kmeans(KMeans),
    MeanShift(MeanShift),
}

impl Default for ClusterAlgorithm {
    fn default() -> Self {
        Self::Kmeans(KMeans::default())
    }
}

impl ClusterAlgorithm {
    /// Palette length to synthesize when clustering fails outright.
    fn fallback_palette_len(&self) -> usize {
        match self {
            Self::Kmeans(params) => params.clusters.max(1),
            Self::MeanShift(_) => 1,
        }
    }
}

impl ColorCluster for ClusterAlgorithm {
    fn cluster(&self, pixels: &[Rgb], rng: &mut dyn RngCore) -> Result<Vec<ClusterColor>, Error> {
        match self {
            Self::Kmeans(params) => params.cluster(pixels, rng),
            Self::MeanShift(params) => params.cluster(pixels, rng),
        }
    }
}

/// Non-integer centroid used while iterating; rounded to [`Rgb`] only at
/// the output boundary.
pub(crate) type Centroid = [f64; 3];

pub(crate) fn centroid(p: Rgb) -> Centroid {
    [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])]
}

pub(crate) fn centroid_distance(a: Centroid, b: Centroid) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

pub(crate) fn mean_centroid(group: &[Rgb]) -> Centroid {
    let mut sum = [0.0f64; 3];
    for p in group {
        sum[0] += f64::from(p[0]);
        sum[1] += f64::from(p[1]);
        sum[2] += f64::from(p[2]);
    }
    let n = group.len() as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

pub(crate) fn round_to_rgb(c: Centroid) -> Rgb {
    c.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Order colors by descending weight. The sort is stable, so equal weights
/// keep the order in which their centers were finalized.
pub(crate) fn sort_by_weight(colors: &mut [ClusterColor]) {
    colors.sort_by(|a, b| b.weight.cmp(&a.weight));
}

/// Strip weights from an already-ranked cluster list.
#[must_use]
pub fn ranked_colors(colors: &[ClusterColor]) -> Vec<Rgb> {
    colors.iter().map(|c| c.rgb).collect()
}

/// Color at `rank` in a ranked palette, clamped into range so asking for a
/// deeper rank than the palette has still yields its least dominant color.
#[must_use]
pub fn nth_color(colors: &[Rgb], rank: usize) -> Option<Rgb> {
    if colors.is_empty() {
        return None;
    }
    Some(colors[rank.min(colors.len() - 1)])
}

/// Full pipeline from a decoded image to a ranked palette: downscale,
/// flatten over white, subsample, drop near-white pixels, cluster.
pub fn extract_palette(
    img: &RgbaImage,
    options: &PaletteConfig,
    rng: &mut dyn RngCore,
) -> Result<Vec<Rgb>, Error> {
    let scaled;
    let img = if options.max_downscale_dim > 0 {
        scaled = pixels::downscale(img, options.max_downscale_dim);
        &scaled
    } else {
        img
    };
    let mut px = pixels::flatten_to_pixels(img);
    if options.subsample > 0 {
        px = pixels::subsample(&px, options.subsample, rng);
    }
    px = pixels::exclude_near_white(px, options.white_exclusion_distance);
    let clusters = options.algorithm.cluster(&px, rng)?;
    Ok(ranked_colors(&clusters))
}

/// Like [`extract_palette`] but degrades to an all-black palette when the
/// pixel data is degenerate. A bad palette must not stall rotation.
pub fn extract_palette_or_black(
    img: &RgbaImage,
    options: &PaletteConfig,
    rng: &mut dyn RngCore,
) -> Vec<Rgb> {
    match extract_palette(img, options, rng) {
        Ok(colors) => colors,
        Err(err) => {
            warn!(error = %err, "palette extraction failed; using black fallback");
            vec![[0, 0, 0]; options.algorithm.fallback_palette_len()]
        }
    }
}
