//! The wallpaper catalog: one record per registered path, with windowed and
//! lifetime usage counters and an optional cached palette.
//!
//! The selection engine only consumes the [`CatalogStore`] trait; the
//! JSON-backed store here is the stock implementation and is free to be
//! swapped for anything that can honor the same single-transaction picks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;
use crate::pixels::Rgb;

fn default_true() -> bool {
    true
}

/// A catalog row with a fixed shape. Counters are unsigned on purpose:
/// `times_used` is windowed (renormalized after every pick, so its minimum
/// across active image records returns to zero), `total_times_used` is a
/// lifetime ledger that only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub filepath: PathBuf,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub include_subdirectories: bool,
    /// Records synced from a directory scan; purged and re-created on refresh.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub times_used: u64,
    #[serde(default)]
    pub total_times_used: u64,
    #[serde(default)]
    pub color_cache: Option<Vec<Rgb>>,
}

impl ImageRecord {
    pub fn file(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            active: true,
            is_directory: false,
            include_subdirectories: false,
            ephemeral: false,
            hidden: false,
            times_used: 0,
            total_times_used: 0,
            color_cache: None,
        }
    }

    pub fn directory(filepath: impl Into<PathBuf>, include_subdirectories: bool) -> Self {
        Self {
            is_directory: true,
            include_subdirectories,
            ..Self::file(filepath)
        }
    }

    /// Only concrete, visible, active image files are candidates for picks.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.active && !self.is_directory && !self.hidden
    }
}

/// The transaction surface the selection engine consumes. Implementations
/// must apply one `pick`'s read + increment + normalize atomically with
/// respect to concurrent picks.
pub trait CatalogStore {
    /// Snapshot of all records eligible for selection.
    fn eligible_images(&self) -> Vec<ImageRecord>;

    /// Bump both usage counters of a picked record.
    fn increment_usage(&mut self, filepath: &Path) -> Result<(), Error>;

    /// Subtract the minimum `times_used` over active non-directory records
    /// from each of them, re-anchoring the windowed counters at zero.
    fn normalize_usage(&mut self);

    fn cached_colors(&self, filepath: &Path) -> Option<Vec<Rgb>>;

    fn store_colors(&mut self, filepath: &Path, colors: &[Rgb]) -> Result<(), Error>;
}

/// In-memory catalog with whole-file JSON persistence.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    records: BTreeMap<PathBuf, ImageRecord>,
    path: Option<PathBuf>,
}

impl JsonCatalog {
    /// An unsaved, empty catalog. Useful for tests and ad hoc runs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a catalog file, or start an empty catalog bound to `path` if the
    /// file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let mut catalog = Self {
            records: BTreeMap::new(),
            path: Some(path.clone()),
        };
        if !path.exists() {
            debug!(path = %path.display(), "catalog file missing; starting empty");
            return Ok(catalog);
        }
        let text = fs::read_to_string(&path)?;
        let rows: Vec<ImageRecord> = serde_json::from_str(&text)?;
        for row in rows {
            catalog.records.insert(row.filepath.clone(), row);
        }
        Ok(catalog)
    }

    /// Persist the catalog. Writes a sibling temp file first and renames it
    /// into place so a crash cannot leave a torn file behind.
    pub fn save(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let rows: Vec<&ImageRecord> = self.records.values().collect();
        let text = serde_json::to_string_pretty(&rows)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, filepath: &Path) -> Option<&ImageRecord> {
        self.records.get(filepath)
    }

    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.values()
    }

    /// Active, visible directory records, for the scanner to expand.
    #[must_use]
    pub fn active_directories(&self) -> Vec<ImageRecord> {
        self.records
            .values()
            .filter(|r| r.active && r.is_directory && !r.hidden)
            .cloned()
            .collect()
    }

    /// Register image files. Re-adding a known path un-hides it instead of
    /// resetting its counters.
    pub fn add_images<I, P>(&mut self, filepaths: I, ephemeral: bool)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for filepath in filepaths {
            let filepath = filepath.into();
            match self.records.get_mut(&filepath) {
                Some(existing) => existing.hidden = false,
                None => {
                    let mut record = ImageRecord::file(filepath.clone());
                    record.ephemeral = ephemeral;
                    self.records.insert(filepath, record);
                }
            }
        }
    }

    /// Register a directory to be expanded by the scanner. Known paths are
    /// left untouched.
    pub fn add_directory(&mut self, filepath: impl Into<PathBuf>, include_subdirectories: bool) {
        let filepath = filepath.into();
        self.records
            .entry(filepath.clone())
            .or_insert_with(|| ImageRecord::directory(filepath, include_subdirectories));
    }

    pub fn hide_images<'a, I>(&mut self, filepaths: I)
    where
        I: IntoIterator<Item = &'a Path>,
    {
        for filepath in filepaths {
            if let Some(record) = self.records.get_mut(filepath) {
                record.hidden = true;
            }
        }
    }

    pub fn set_active(&mut self, filepath: &Path, active: bool) {
        match self.records.get_mut(filepath) {
            Some(record) => record.active = active,
            None => warn!(path = %filepath.display(), "cannot set active flag: unknown image"),
        }
    }

    pub fn remove(&mut self, filepath: &Path) {
        if self.records.remove(filepath).is_none() {
            warn!(path = %filepath.display(), "cannot remove: unknown image");
        }
    }

    /// Drop every ephemeral record, ahead of a directory re-sync.
    pub fn remove_ephemeral(&mut self) {
        self.records.retain(|_, r| !r.ephemeral);
    }
}

impl CatalogStore for JsonCatalog {
    fn eligible_images(&self) -> Vec<ImageRecord> {
        self.records
            .values()
            .filter(|r| r.is_eligible())
            .cloned()
            .collect()
    }

    fn increment_usage(&mut self, filepath: &Path) -> Result<(), Error> {
        let record = self
            .records
            .get_mut(filepath)
            .ok_or_else(|| Error::UnknownImage(filepath.to_path_buf()))?;
        record.times_used += 1;
        record.total_times_used += 1;
        Ok(())
    }

    fn normalize_usage(&mut self) {
        // Hidden records deliberately take part here: they are still active
        // rows and must not drift away from the window.
        let min_used = self
            .records
            .values()
            .filter(|r| r.active && !r.is_directory)
            .map(|r| r.times_used)
            .min();
        let Some(min_used) = min_used else {
            return;
        };
        if min_used == 0 {
            return;
        }
        for record in self.records.values_mut() {
            if record.active && !record.is_directory {
                record.times_used -= min_used;
            }
        }
    }

    fn cached_colors(&self, filepath: &Path) -> Option<Vec<Rgb>> {
        self.records.get(filepath)?.color_cache.clone()
    }

    fn store_colors(&mut self, filepath: &Path, colors: &[Rgb]) -> Result<(), Error> {
        let record = self
            .records
            .get_mut(filepath)
            .ok_or_else(|| Error::UnknownImage(filepath.to_path_buf()))?;
        record.color_cache = Some(colors.to_vec());
        Ok(())
    }
}
