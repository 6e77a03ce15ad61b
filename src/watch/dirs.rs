//! Directory enumeration for the change bridge.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::WatchError;

/// Every directory under `roots` (roots included), canonicalized, unique,
/// in discovery order.
pub fn list_subdirs(roots: &[PathBuf]) -> Result<Vec<PathBuf>, WatchError> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();
    for root in roots {
        let root = canonicalize(root)?;
        // No ignore files, no hidden filter: every directory is a candidate.
        for entry in WalkBuilder::new(&root).standard_filters(false).build() {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                continue;
            }
            let path = entry.into_path();
            if seen.insert(path.clone()) {
                dirs.push(path);
            }
        }
    }
    Ok(dirs)
}

/// `dirs` minus every directory found under `excluded`.
///
/// Exclusions that cannot be enumerated are skipped with a warning.
pub fn exclude_subdirs(dirs: Vec<PathBuf>, excluded: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = HashSet::new();
    for path in excluded {
        match list_subdirs(std::slice::from_ref(path)) {
            Ok(found) => removed.extend(found),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring exclusion"),
        }
    }
    dirs.into_iter().filter(|d| !removed.contains(d)).collect()
}

fn canonicalize(path: &Path) -> Result<PathBuf, WatchError> {
    path.canonicalize().map_err(|source| WatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}
