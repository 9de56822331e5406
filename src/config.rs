use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::clustering::{ClusterAlgorithm, KMeans, MeanShift};
use crate::error::Error;
use crate::selection::Strategy;

/// Top-level YAML configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Path of the JSON catalog file. Created on first save if missing.
    pub catalog: PathBuf,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RotationConfig {
    pub strategy: Strategy,
    /// Time between automatic wallpaper swaps.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            interval: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PaletteConfig {
    /// Reuse palettes cached on catalog records instead of re-clustering.
    pub cache: bool,
    /// Bound on the larger image dimension before sampling; 0 disables.
    pub max_downscale_dim: u32,
    /// Pixels to draw (without replacement) before clustering; 0 disables.
    pub subsample: usize,
    /// Drop pixels within this distance of pure white; 0 disables.
    pub white_exclusion_distance: f64,
    pub algorithm: ClusterAlgorithm,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            cache: true,
            max_downscale_dim: 700,
            subsample: 0,
            white_exclusion_distance: 100.0,
            algorithm: ClusterAlgorithm::default(),
        }
    }
}

/// Load a [`Configuration`] from a YAML file.
pub fn from_yaml_file(path: &Path) -> Result<Configuration, Error> {
    let text = fs::read_to_string(path)?;
    let cfg: Configuration = serde_yaml::from_str(&text)?;
    Ok(cfg)
}

impl Configuration {
    /// Cross-field checks that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        if self.rotation.interval < Duration::from_secs(1) {
            return Err(Error::InvalidConfig(
                "rotation interval must be at least one second".into(),
            ));
        }
        if self.palette.white_exclusion_distance < 0.0 {
            return Err(Error::InvalidConfig(
                "white-exclusion-distance must not be negative".into(),
            ));
        }
        match &self.palette.algorithm {
            ClusterAlgorithm::Kmeans(KMeans {
                clusters,
                max_iterations,
                convergence_distance,
                pruning_distance,
            }) => {
                if *clusters == 0 {
                    return Err(Error::InvalidConfig("kmeans needs at least one cluster".into()));
                }
                if *max_iterations == 0 {
                    return Err(Error::InvalidConfig(
                        "kmeans needs at least one iteration".into(),
                    ));
                }
                if *convergence_distance < 0.0 || *pruning_distance < 0.0 {
                    return Err(Error::InvalidConfig(
                        "kmeans distances must not be negative".into(),
                    ));
                }
            }
            ClusterAlgorithm::MeanShift(MeanShift {
                radius,
                tolerance,
                max_iterations,
            }) => {
                if *radius <= 0.0 {
                    return Err(Error::InvalidConfig(
                        "mean-shift radius must be positive".into(),
                    ));
                }
                if *tolerance <= 0.0 {
                    return Err(Error::InvalidConfig(
                        "mean-shift tolerance must be positive".into(),
                    ));
                }
                if *max_iterations == 0 {
                    return Err(Error::InvalidConfig(
                        "mean-shift needs at least one iteration".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
