//! History tree manager.
//!
//! Owns the on-disk site history around a render:
//!
//! ```text
//! {site_root}/{prefix}/
//! ├── index.html       # redirect to the newest run
//! ├── last-history/    # continuity fragment for the next run
//! └── {run}/           # one folder per retained run
//!     ├── index.html
//!     └── history/
//! ```
//!
//! Before rendering it seeds the results with the previous `last-history`
//! and, for staged publishes, copies the previous site into the output root.
//! After the continuity update it prunes run folders beyond the retention
//! limit.

pub mod retention;
pub mod tree;

use std::path::Path;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::errors::{PublishError, PublishResult};
use crate::fsutil::{copy_tree_merge, ensure_dir};

pub use retention::{ArchivedRun, RetentionPlan, RunOrdering, archived_runs, plan_retention};
pub use tree::{FsTree, SiteEntry, SiteTree};

/// A run folder that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneFailure {
    pub folder_name: String,
    pub error: String,
}

/// Result of a retention pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub ordering: RunOrdering,
    pub kept: Vec<String>,
    pub removed: Vec<String>,
    pub failed: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn total_found(&self) -> usize {
        self.kept.len() + self.removed.len() + self.failed.len()
    }
}

/// Stateless manager over a [`SiteTree`]; every call takes the run config.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager<T: SiteTree = FsTree> {
    tree: T,
}

impl HistoryManager<FsTree> {
    pub fn new() -> Self {
        Self { tree: FsTree }
    }
}

impl<T: SiteTree> HistoryManager<T> {
    pub fn with_tree(tree: T) -> Self {
        Self { tree }
    }

    /// Copy the previous `last-history` fragment into `{results}/history`.
    ///
    /// Creates an empty fragment on first run. The source is copied, never
    /// moved, so a rerun sees the same previous history.
    pub fn merge_previous_history(&self, config: &RunConfig) -> PublishResult<usize> {
        let fragment = config.previous_last_history();
        ensure_dir(&fragment)?;
        let copied = copy_tree_merge(&fragment, &config.results_history_dir())?;
        info!(
            files = copied,
            from = %fragment.display(),
            "Merged previous history into results"
        );
        Ok(copied)
    }

    /// For staged publishes, merge the previous site into the output root so
    /// the new run lands next to every archived run. No-op when in place.
    pub fn stage_previous_site(&self, config: &RunConfig) -> PublishResult<Option<usize>> {
        if config.is_in_place() {
            return Ok(None);
        }
        let copied = copy_tree_merge(&config.history_root, &config.output_root)?;
        info!(
            files = copied,
            from = %config.history_root.display(),
            to = %config.output_root.display(),
            "Copied previous site into output root"
        );
        Ok(Some(copied))
    }

    /// List the archived runs under `root`.
    pub fn archived_runs(&self, root: &Path, current: Option<&str>) -> PublishResult<Vec<ArchivedRun>> {
        let entries = self
            .tree
            .entries(root)
            .map_err(|e| PublishError::io(root, e))?;
        Ok(archived_runs(&entries, current))
    }

    /// Work out which runs under `root` exceed `limit`, without deleting.
    pub fn plan(
        &self,
        root: &Path,
        limit: usize,
        protect: Option<&str>,
    ) -> PublishResult<RetentionPlan> {
        let runs = self.archived_runs(root, protect)?;
        Ok(plan_retention(runs, limit, protect))
    }

    /// Delete the folders a plan selected. Failures are logged per folder and
    /// do not stop the remaining removals.
    pub fn apply(&self, root: &Path, plan: RetentionPlan) -> PruneReport {
        let mut removed = Vec::new();
        let mut failed = Vec::new();

        for run in plan.remove {
            let path = root.join(&run.folder_name);
            info!("Removing {} ...", run.folder_name);
            match self.tree.remove_subtree(&path) {
                Ok(()) => removed.push(run.folder_name),
                Err(e) => {
                    warn!(
                        folder = %path.display(),
                        error = %e,
                        "Failed to remove archived run, continuing"
                    );
                    failed.push(PruneFailure {
                        folder_name: run.folder_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        PruneReport {
            ordering: plan.ordering,
            kept: plan.keep.into_iter().map(|r| r.folder_name).collect(),
            removed,
            failed,
        }
    }

    /// Plan and apply a retention pass over `root`.
    pub fn prune_root(
        &self,
        root: &Path,
        limit: usize,
        protect: Option<&str>,
    ) -> PublishResult<PruneReport> {
        let plan = self.plan(root, limit, protect)?;
        info!(
            "Found {} report(s) in history, keeping {}",
            plan.keep.len() + plan.remove.len(),
            if limit == 0 {
                "all".to_string()
            } else {
                limit.to_string()
            }
        );
        Ok(self.apply(root, plan))
    }

    /// Retention pass over the published tree, protecting the new run.
    pub fn prune(&self, config: &RunConfig) -> PublishResult<PruneReport> {
        self.prune_root(
            &config.output_root,
            config.retention_limit,
            Some(&config.run_identifier),
        )
    }
}
