//! Picking the next wallpaper from the catalog.
//!
//! Every pick is a single read-modify-write against the catalog store:
//! choose a record, optionally bump its usage counters, then renormalize
//! the windowed counters so their minimum returns to zero. The engine holds
//! no state between calls; history belongs to the caller.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{CatalogStore, ImageRecord};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Equal probability over all eligible records.
    Uniform,
    /// Weight `max(times_used) - times_used + 1`: the less an image has been
    /// shown inside the current window, the more likely it comes up next.
    UsageWeighted,
    /// Uniform over the records sharing the minimum `times_used`.
    LeastUsed,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::UsageWeighted
    }
}

impl Strategy {
    const NAMES: &'static [&'static str] = &["uniform", "usage-weighted", "least-used"];

    fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::UsageWeighted => "usage-weighted",
            Self::LeastUsed => "least-used",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "uniform" => Ok(Self::Uniform),
            "usage-weighted" => Ok(Self::UsageWeighted),
            "least-used" => Ok(Self::LeastUsed),
            _ => Err(Error::InvalidStrategy(format!(
                "{raw} (expected one of {})",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Pick the next wallpaper path.
///
/// `increment` is false for preview/test picks: the chosen record's counters
/// stay put, but normalization still runs, exactly as a regular pick.
///
/// # Errors
/// [`Error::EmptyCatalog`] when no record is eligible. Non-retryable;
/// surface it to the user instead of looping.
pub fn pick<S, R>(
    store: &mut S,
    strategy: Strategy,
    increment: bool,
    rng: &mut R,
) -> Result<PathBuf, Error>
where
    S: CatalogStore + ?Sized,
    R: Rng + ?Sized,
{
    let records = store.eligible_images();
    let chosen = match strategy {
        Strategy::Uniform => choose_uniform(&records, rng),
        Strategy::UsageWeighted => choose_weighted(&records, rng),
        Strategy::LeastUsed => choose_least_used(&records, rng),
    }
    .ok_or(Error::EmptyCatalog)?
    .filepath
    .clone();

    if increment {
        store.increment_usage(&chosen)?;
    }
    store.normalize_usage();
    debug!(strategy = %strategy, path = %chosen.display(), increment, "picked wallpaper");
    Ok(chosen)
}

fn choose_uniform<'a, R: Rng + ?Sized>(
    records: &'a [ImageRecord],
    rng: &mut R,
) -> Option<&'a ImageRecord> {
    records.choose(rng)
}

fn choose_weighted<'a, R: Rng + ?Sized>(
    records: &'a [ImageRecord],
    rng: &mut R,
) -> Option<&'a ImageRecord> {
    let max_used = records.iter().map(|r| r.times_used).max()?;
    // Invert the counters so every weight is at least 1.
    let weights: Vec<u64> = records.iter().map(|r| max_used - r.times_used + 1).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    records.get(dist.sample(rng))
}

fn choose_least_used<'a, R: Rng + ?Sized>(
    records: &'a [ImageRecord],
    rng: &mut R,
) -> Option<&'a ImageRecord> {
    let min_used = records.iter().map(|r| r.times_used).min()?;
    let least_used: Vec<&ImageRecord> = records
        .iter()
        .filter(|r| r.times_used == min_used)
        .collect();
    least_used.choose(rng).copied()
}
