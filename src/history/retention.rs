//! Which archived runs survive a retention pass.
//!
//! Everything here is pure: it works on [`SiteEntry`] listings and never
//! touches the disk.
//!
//! Ordering policy (oldest first):
//! - all run folder names numeric: by numeric value, then name
//! - otherwise: by modification time (unknown times count as oldest), then name

use std::cmp::Ordering;
use std::time::SystemTime;

use super::tree::SiteEntry;
use crate::config::LAST_HISTORY_DIR;

/// Non-run entries that may sit at the history root.
pub const SENTINEL_NAMES: &[&str] = &[LAST_HISTORY_DIR, "index.html", "CNAME"];

/// A previously published run folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRun {
    pub folder_name: String,
    pub modified_time: Option<SystemTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrdering {
    NumericName,
    ModifiedTime,
}

impl std::fmt::Display for RunOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOrdering::NumericName => write!(f, "run number"),
            RunOrdering::ModifiedTime => write!(f, "modification time"),
        }
    }
}

/// Outcome of planning a retention pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub ordering: RunOrdering,
    /// Oldest first
    pub keep: Vec<ArchivedRun>,
    /// Oldest first
    pub remove: Vec<ArchivedRun>,
}

/// Numeric run identifiers are the run-folder naming convention.
pub fn is_run_folder_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Derive the set of archived runs from a listing of the history root.
///
/// Keeps directories with numeric names, plus `current` (the run being
/// published) whatever its name, so a non-numeric identifier is still counted.
pub fn archived_runs(entries: &[SiteEntry], current: Option<&str>) -> Vec<ArchivedRun> {
    entries
        .iter()
        .filter(|e| e.is_dir)
        .filter(|e| !SENTINEL_NAMES.contains(&e.name.as_str()))
        .filter(|e| is_run_folder_name(&e.name) || current == Some(e.name.as_str()))
        .map(|e| ArchivedRun {
            folder_name: e.name.clone(),
            modified_time: e.modified,
        })
        .collect()
}

/// Sort `runs` oldest first and report which key was used.
pub fn sort_runs(runs: &mut [ArchivedRun]) -> RunOrdering {
    if runs.iter().all(|r| is_run_folder_name(&r.folder_name)) {
        runs.sort_by(|a, b| {
            compare_numeric(&a.folder_name, &b.folder_name)
                .then_with(|| a.folder_name.cmp(&b.folder_name))
        });
        RunOrdering::NumericName
    } else {
        runs.sort_by(|a, b| {
            a.modified_time
                .cmp(&b.modified_time)
                .then_with(|| a.folder_name.cmp(&b.folder_name))
        });
        RunOrdering::ModifiedTime
    }
}

/// Compare two digit strings by value without parsing (no overflow).
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Decide which runs to delete so that at most `limit` remain.
///
/// `limit == 0` keeps everything. The newest run and `protect` (the run just
/// published) are never selected, so in the rare case where they differ and
/// `limit == 1` one extra run is kept.
pub fn plan_retention(
    mut runs: Vec<ArchivedRun>,
    limit: usize,
    protect: Option<&str>,
) -> RetentionPlan {
    let ordering = sort_runs(&mut runs);

    if limit == 0 || runs.len() <= limit {
        return RetentionPlan {
            ordering,
            keep: runs,
            remove: Vec::new(),
        };
    }

    let mut excess = runs.len() - limit;
    let newest = runs.last().map(|r| r.folder_name.clone());
    let mut keep = Vec::with_capacity(limit);
    let mut remove = Vec::with_capacity(excess);

    for run in runs {
        let protected = Some(run.folder_name.as_str()) == protect
            || Some(&run.folder_name) == newest.as_ref();
        if excess > 0 && !protected {
            remove.push(run);
            excess -= 1;
        } else {
            keep.push(run);
        }
    }

    RetentionPlan {
        ordering,
        keep,
        remove,
    }
}
