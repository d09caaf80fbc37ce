//! Filesystem helpers shared by the history and continuity steps.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{PublishError, PublishResult};

/// Recursively copy `src` into `dst`, creating directories as needed.
///
/// Existing files in `dst` are overwritten (last writer wins) and files that
/// exist only in `dst` are left alone. `src` is never modified.
/// Returns the number of files copied.
pub fn copy_tree_merge(src: &Path, dst: &Path) -> PublishResult<usize> {
    if !src.is_dir() {
        return Err(PublishError::io(
            src,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source directory does not exist"),
        ));
    }
    fs::create_dir_all(dst).map_err(|e| PublishError::io(dst, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            PublishError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PublishError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| PublishError::io(&target, e))?;
            copied += 1;
        }
    }

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        files = copied,
        "Merged directory tree"
    );
    Ok(copied)
}

/// True when `dir` exists and has at least one entry.
pub fn has_entries(dir: &Path) -> PublishResult<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(dir).map_err(|e| PublishError::io(dir, e))?;
    Ok(entries.next().is_some())
}

/// Create `dir` and its parents if absent. Never fails on an existing directory.
pub fn ensure_dir(dir: &Path) -> PublishResult<()> {
    fs::create_dir_all(dir).map_err(|e| PublishError::io(dir, e))
}
