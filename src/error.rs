use std::path::PathBuf;

use thiserror::Error;

/// Library error type for wallshift operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog holds no active, visible image files to pick from.
    /// Non-retryable; the user has to add or re-activate images.
    #[error("no eligible images in the catalog")]
    EmptyCatalog,

    /// A selection strategy name that does not match any known strategy.
    #[error("invalid selection strategy: {0:?}")]
    InvalidStrategy(String),

    /// Clustering was asked to run over an empty pixel set.
    #[error("no pixels to cluster")]
    EmptyInput,

    /// The cluster population collapsed (no seeds available, or every
    /// group emptied out). Callers fall back to a default palette.
    #[error("degenerate clustering: {0}")]
    DegenerateClustering(String),

    /// An operation referenced a filepath the catalog does not know.
    #[error("image not in catalog: {}", .0.display())]
    UnknownImage(PathBuf),

    /// A catalog directory entry is missing or not a directory.
    #[error("invalid image directory: {0}")]
    BadDirectory(String),

    /// A configuration value failed cross-field validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image decode failure from the pixel source. Transient from the
    /// rotation loop's point of view: skip the file and pick again.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Catalog file (de)serialization error.
    #[error(transparent)]
    CatalogFormat(#[from] serde_json::Error),
}
