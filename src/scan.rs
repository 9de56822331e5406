//! Directory scanning: expands the catalog's directory records into concrete
//! image files.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::catalog::JsonCatalog;
use crate::error::Error;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

/// Collect the image files under `root`, sorted for deterministic syncs.
///
/// # Errors
/// Returns [`Error::BadDirectory`] if `root` is missing or not a directory.
pub fn scan_directory(root: &Path, include_subdirectories: bool) -> Result<Vec<PathBuf>, Error> {
    if !root.exists() || !root.is_dir() {
        return Err(Error::BadDirectory(root.to_string_lossy().into_owned()));
    }

    let mut wd = WalkDir::new(root);
    if !include_subdirectories {
        wd = wd.max_depth(1);
    }

    let mut out = Vec::new();
    for entry in wd
        .into_iter()
        // Skip hidden dot-directories *below* the root only.
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
    {
        let path = entry.path();
        if path.is_file() && is_supported_image(path) {
            out.push(path.to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// Re-sync directory-derived records: purge the old ephemeral rows, then
/// register everything found under the catalog's active directories.
/// Unreadable directories are skipped with a warning so one stale entry
/// cannot stall the whole refresh. Returns how many files were discovered.
pub fn refresh_catalog(catalog: &mut JsonCatalog) -> usize {
    catalog.remove_ephemeral();
    let mut discovered = 0;
    for dir in catalog.active_directories() {
        match scan_directory(&dir.filepath, dir.include_subdirectories) {
            Ok(found) => {
                info!(dir = %dir.filepath.display(), count = found.len(), "scanned directory");
                discovered += found.len();
                catalog.add_images(found, true);
            }
            Err(err) => {
                warn!(dir = %dir.filepath.display(), error = %err, "skipping unreadable directory");
            }
        }
    }
    discovered
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a.PNG")));
        assert!(is_supported_image(Path::new("b.JpEg")));
        assert!(!is_supported_image(Path::new("c.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = scan_directory(Path::new("/definitely/not/here"), true).unwrap_err();
        assert!(matches!(err, Error::BadDirectory(_)));
    }
}
