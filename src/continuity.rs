//! Continuity updater.
//!
//! Promotes the `history/` fragment the renderer just produced to the
//! canonical `last-history` directory that the next run seeds its results
//! from. The new fragment is assembled in a hidden sibling directory and then
//! swapped in with two renames. `last-history` is never half-copied. It is
//! briefly absent between the renames, and if the swap fails the previous
//! fragment is renamed back.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{LAST_HISTORY_DIR, RunConfig};
use crate::errors::{PublishError, PublishResult};
use crate::fsutil::copy_tree_merge;

/// Replace `{output_root}/last-history` with `{run_output_dir}/history`.
/// Returns the number of files in the new fragment.
pub fn update_last_history(config: &RunConfig) -> PublishResult<usize> {
    let rendered = config.run_output_dir().join("history");
    replace_fragment(&rendered, &config.published_last_history())
}

/// Replace the directory `target` with a copy of `source`.
pub fn replace_fragment(source: &Path, target: &Path) -> PublishResult<usize> {
    if !source.is_dir() {
        return Err(PublishError::MissingHistory {
            path: source.to_path_buf(),
        });
    }
    let parent = target
        .parent()
        .ok_or_else(|| PublishError::io(target, std::io::Error::other("no parent directory")))?;
    fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}-", LAST_HISTORY_DIR))
        .tempdir_in(parent)
        .map_err(|e| PublishError::io(parent, e))?;
    let copied = copy_tree_merge(source, staging.path())?;

    let backup = if target.exists() {
        let backup = backup_path(target);
        if backup.exists() {
            fs::remove_dir_all(&backup).map_err(|e| PublishError::io(&backup, e))?;
        }
        fs::rename(target, &backup).map_err(|e| PublishError::io(target, e))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging.path(), target) {
        if let Some(backup) = &backup {
            // put the previous fragment back so the next run still has it
            if let Err(restore) = restore_backup(backup, target) {
                warn!(
                    backup = %backup.display(),
                    target = %target.display(),
                    error = %restore,
                    "Failed to restore previous history fragment"
                );
            }
        }
        return Err(PublishError::io(target, e));
    }

    if let Some(backup) = backup {
        if let Err(e) = fs::remove_dir_all(&backup) {
            warn!(
                path = %backup.display(),
                error = %e,
                "Failed to remove previous history fragment"
            );
        }
    }

    info!(
        files = copied,
        to = %target.display(),
        "Updated last history"
    );
    Ok(copied)
}

fn restore_backup(backup: &Path, target: &Path) -> std::io::Result<()> {
    fs::rename(backup, target)
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| LAST_HISTORY_DIR.to_string());
    target.with_file_name(format!(".{}.old-{}", name, std::process::id()))
}
