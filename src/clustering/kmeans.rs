use rand::RngCore;
use rand::seq::index;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    Centroid, ClusterColor, ColorCluster, centroid, centroid_distance, mean_centroid,
    round_to_rgb, sort_by_weight,
};
use crate::error::Error;
use crate::pixels::Rgb;

/// Lloyd's iteration with an adaptive cluster count: centers whose group
/// empties are dropped, and converged centers that crowd each other are
/// pruned down to the best-supported one per neighborhood.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KMeans {
    /// Number of centers seeded from the pixel population.
    pub clusters: usize,
    pub max_iterations: usize,
    /// Centers that all move at most this far count as converged.
    pub convergence_distance: f64,
    /// Centers at most this far apart are merged after convergence.
    /// Zero disables pruning.
    pub pruning_distance: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            clusters: 5,
            max_iterations: 10,
            convergence_distance: 1.0,
            pruning_distance: 10.0,
        }
    }
}

impl ColorCluster for KMeans {
    fn cluster(&self, pixels: &[Rgb], rng: &mut dyn RngCore) -> Result<Vec<ClusterColor>, Error> {
        if pixels.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.clusters == 0 {
            return Err(Error::DegenerateClustering("cluster count is zero".into()));
        }
        if pixels.len() < self.clusters {
            return Err(Error::DegenerateClustering(format!(
                "{} pixels cannot seed {} clusters",
                pixels.len(),
                self.clusters
            )));
        }

        // Seed from the data itself, not from arbitrary random colors.
        let mut centers: Vec<Centroid> = index::sample(rng, pixels.len(), self.clusters)
            .into_iter()
            .map(|i| centroid(pixels[i]))
            .collect();
        let mut groups: Vec<Vec<Rgb>> = Vec::new();

        for _ in 0..self.max_iterations {
            groups = assign_to_nearest(pixels, &centers);

            if groups.iter().any(Vec::is_empty) {
                let before = centers.len();
                let mut kept_centers = Vec::with_capacity(before);
                let mut kept_groups = Vec::with_capacity(before);
                for (center, group) in centers.into_iter().zip(groups) {
                    if !group.is_empty() {
                        kept_centers.push(center);
                        kept_groups.push(group);
                    }
                }
                warn!(removed = before - kept_centers.len(), "removed empty cluster groups");
                centers = kept_centers;
                groups = kept_groups;
            }
            if centers.is_empty() {
                return Err(Error::DegenerateClustering(
                    "every cluster group emptied out".into(),
                ));
            }

            let previous = centers.clone();
            centers = groups.iter().map(|g| mean_centroid(g)).collect();
            if !within_distance(&previous, &centers, self.convergence_distance) {
                continue;
            }
            if self.pruning_distance <= 0.0 {
                break;
            }
            let keep = prune_survivors(&centers, &groups, self.pruning_distance);
            if keep.len() == centers.len() {
                break;
            }
            debug!(pruned = centers.len() - keep.len(), "pruned crowded centers");
            centers = keep.iter().map(|&i| centers[i]).collect();
            let mut pruned_groups = Vec::with_capacity(keep.len());
            for (i, group) in groups.into_iter().enumerate() {
                if keep.contains(&i) {
                    pruned_groups.push(group);
                }
            }
            groups = pruned_groups;
            // Pruned centers must re-balance against the pixels, so keep
            // iterating instead of returning here.
        }

        let mut colors: Vec<ClusterColor> = centers
            .iter()
            .zip(&groups)
            .map(|(center, group)| ClusterColor {
                rgb: round_to_rgb(*center),
                weight: group.len(),
            })
            .collect();
        sort_by_weight(&mut colors);
        Ok(colors)
    }
}

/// Assign every pixel to its nearest center; ties go to the lowest index.
fn assign_to_nearest(pixels: &[Rgb], centers: &[Centroid]) -> Vec<Vec<Rgb>> {
    let mut groups: Vec<Vec<Rgb>> = vec![Vec::new(); centers.len()];
    for &p in pixels {
        let point = centroid(p);
        let mut best = 0usize;
        let mut best_distance = f64::INFINITY;
        for (i, &center) in centers.iter().enumerate() {
            let d = centroid_distance(point, center);
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }
        groups[best].push(p);
    }
    groups
}

fn within_distance(previous: &[Centroid], current: &[Centroid], max_distance: f64) -> bool {
    previous
        .iter()
        .zip(current)
        .all(|(a, b)| centroid_distance(*a, *b) <= max_distance)
}

/// Indices of the centers that survive pruning, in their original order.
///
/// Builds the undirected "too close" graph (pairwise distance within
/// `pruning_distance`), and keeps one center per connected component: the
/// one with the largest assigned group, lowest index on ties.
fn prune_survivors(centers: &[Centroid], groups: &[Vec<Rgb>], pruning_distance: f64) -> Vec<usize> {
    let n = centers.len();
    let mut visited = vec![false; n];
    let mut survivors = Vec::with_capacity(n);

    for start in 0..n {
        if visited[start] {
            continue;
        }
        // BFS over the too-close graph from this center.
        let mut component = vec![start];
        visited[start] = true;
        let mut cursor = 0;
        while cursor < component.len() {
            let i = component[cursor];
            cursor += 1;
            for j in 0..n {
                if !visited[j] && centroid_distance(centers[i], centers[j]) <= pruning_distance {
                    visited[j] = true;
                    component.push(j);
                }
            }
        }
        let winner = component
            .iter()
            .copied()
            .max_by(|&a, &b| groups[a].len().cmp(&groups[b].len()).then(b.cmp(&a)))
            .unwrap_or(start);
        survivors.push(winner);
    }

    survivors.sort_unstable();
    survivors
}
