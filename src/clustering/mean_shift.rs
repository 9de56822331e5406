use rand::RngCore;
use serde::Deserialize;
use tracing::{debug, trace};

use super::{ClusterColor, ColorCluster, centroid, centroid_distance, mean_centroid, round_to_rgb, sort_by_weight};
use crate::error::Error;
use crate::pixels::Rgb;

/// Mode-seeking with point removal: each converged cluster permanently
/// claims the pixels inside its radius, so later clusters only compete for
/// the remaining population. The cluster count is discovered, not fixed.
///
/// A small `radius` degrades into a storm of abandoned singleton seeds; a
/// large one lets a few clusters swallow everything early.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MeanShift {
    /// Points strictly closer than this to the candidate center belong to it.
    pub radius: f64,
    /// Center movement below this counts as converged.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self {
            radius: 30.0,
            tolerance: 0.001,
            max_iterations: 100,
        }
    }
}

impl ColorCluster for MeanShift {
    fn cluster(&self, pixels: &[Rgb], _rng: &mut dyn RngCore) -> Result<Vec<ClusterColor>, Error> {
        if pixels.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut points: Vec<Rgb> = pixels.to_vec();
        let mut found: Vec<ClusterColor> = Vec::new();

        while !points.is_empty() {
            trace!(remaining = points.len(), "seeding next cluster");
            let mut center = centroid(points[0]);
            let mut claimed: Vec<usize> = Vec::new();

            for _ in 0..self.max_iterations {
                claimed = points
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| centroid_distance(centroid(**p), center) < self.radius)
                    .map(|(i, _)| i)
                    .collect();
                if claimed.is_empty() {
                    break;
                }
                let members: Vec<Rgb> = claimed.iter().map(|&i| points[i]).collect();
                let next = mean_centroid(&members);
                let moved = centroid_distance(next, center);
                center = next;
                if moved < self.tolerance {
                    break;
                }
                // Running out of iterations counts as a soft convergence,
                // not an error.
            }

            if claimed.is_empty() {
                // The center wandered away from every remaining point (or
                // the radius admits nothing). Drop just the seed, form no
                // cluster. Intentional: downstream counts depend on it.
                debug!("abandoning seed with empty neighborhood");
                points.remove(0);
                continue;
            }

            found.push(ClusterColor {
                rgb: round_to_rgb(center),
                weight: claimed.len(),
            });
            let mut index = 0;
            points.retain(|_| {
                let keep = !claimed.contains(&index);
                index += 1;
                keep
            });
        }

        sort_by_weight(&mut found);
        Ok(found)
    }
}
