//! Pixel extraction for the clustering pipeline: flattening transparency
//! against white, bounded downscaling, subsampling, and near-white exclusion.

use image::{RgbaImage, imageops};
use rand::Rng;
use rand::seq::index;

/// One RGB pixel. Plain value, no identity.
pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];

/// Euclidean distance between two pixels in RGB space.
#[must_use]
pub fn distance(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Flatten an image to opaque RGB by compositing every pixel over a white
/// background, the same as pasting onto a white canvas before sampling.
#[must_use]
pub fn flatten_to_pixels(img: &RgbaImage) -> Vec<Rgb> {
    img.pixels()
        .map(|p| {
            let alpha = f64::from(p[3]) / 255.0;
            let blend = |c: u8| -> u8 {
                (f64::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8
            };
            [blend(p[0]), blend(p[1]), blend(p[2])]
        })
        .collect()
}

/// Resize so the larger dimension matches `max_dim`, keeping aspect ratio.
/// Images already within bounds are returned untouched; this never upscales.
#[must_use]
pub fn downscale(img: &RgbaImage, max_dim: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let largest = width.max(height);
    if max_dim == 0 || largest <= max_dim {
        return img.clone();
    }
    let scale = f64::from(max_dim) / f64::from(largest);
    let new_w = ((f64::from(width) * scale) as u32).max(1);
    let new_h = ((f64::from(height) * scale) as u32).max(1);
    imageops::resize(img, new_w, new_h, imageops::FilterType::Lanczos3)
}

/// Draw `count` pixels uniformly without replacement. Asking for more pixels
/// than exist returns the whole population.
#[must_use]
pub fn subsample<R: Rng + ?Sized>(pixels: &[Rgb], count: usize, rng: &mut R) -> Vec<Rgb> {
    if count >= pixels.len() {
        return pixels.to_vec();
    }
    index::sample(rng, pixels.len(), count)
        .into_iter()
        .map(|i| pixels[i])
        .collect()
}

/// Drop pixels closer to pure white than `distance_threshold` (blown-out
/// backgrounds are not interesting mat colors). A zero threshold disables
/// the filter. Applying the filter twice is the same as applying it once.
#[must_use]
pub fn exclude_near_white(pixels: Vec<Rgb>, distance_threshold: f64) -> Vec<Rgb> {
    if distance_threshold == 0.0 {
        return pixels;
    }
    pixels
        .into_iter()
        .filter(|p| distance(*p, WHITE) >= distance_threshold)
        .collect()
}
