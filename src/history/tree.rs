//! Directory-listing seam over the published site.
//!
//! Retention decisions only need names, kinds and modification times of the
//! immediate children of the history root, plus the ability to remove a
//! subtree. Keeping that behind [`SiteTree`] lets the ordering and pruning
//! logic run against an in-memory tree in tests.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEntry {
    pub name: String,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

impl SiteEntry {
    pub fn dir(name: impl Into<String>, modified: Option<SystemTime>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            modified,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            modified: None,
        }
    }
}

pub trait SiteTree {
    /// List the immediate children of `dir`.
    fn entries(&self, dir: &Path) -> io::Result<Vec<SiteEntry>>;

    /// Remove `path` and everything below it.
    fn remove_subtree(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTree;

impl SiteTree for FsTree {
    fn entries(&self, dir: &Path) -> io::Result<Vec<SiteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Non-UTF-8 names can never be run identifiers.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // symlink_metadata: a link to a directory is not a run folder
            let metadata = entry.path().symlink_metadata()?;
            entries.push(SiteEntry {
                name,
                is_dir: metadata.is_dir(),
                modified: metadata.modified().ok(),
            });
        }
        Ok(entries)
    }

    fn remove_subtree(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}
