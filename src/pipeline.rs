//! The per-invocation publishing pipeline.
//!
//! ```text
//! Init → Validated → HistoryMerged → Rendered → ContinuityUpdated → Pruned → Published
//! ```
//!
//! Any fatal error stops the pipeline and is returned as a [`StageError`]
//! naming the stage that was being entered. Nothing is retried here; every
//! step is safe to repeat, so the caller retries by re-running the whole
//! invocation with the same run identifier.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::{CiContext, RawInputs, RunConfig};
use crate::continuity::update_last_history;
use crate::errors::{PublishError, PublishResult, StageError};
use crate::history::{FsTree, HistoryManager, PruneReport, SiteTree};
use crate::landing::{write_executor_json, write_index_html};
use crate::outputs::{PublishOutputs, emit_outputs, write_summary};
use crate::render::Renderer;

/// Entries the pipeline itself writes into the results directory.
const GENERATED_RESULT_ENTRIES: &[&str] = &["history", "executor.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Validated,
    HistoryMerged,
    Rendered,
    ContinuityUpdated,
    Pruned,
    Published,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::Validated => write!(f, "configuration"),
            Stage::HistoryMerged => write!(f, "history merge"),
            Stage::Rendered => write!(f, "render"),
            Stage::ContinuityUpdated => write!(f, "continuity update"),
            Stage::Pruned => write!(f, "prune"),
            Stage::Published => write!(f, "publish"),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub outputs: PublishOutputs,
    pub prune: PruneReport,
    /// Files in the promoted `last-history` fragment
    pub history_files: usize,
}

trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageExt<T> for PublishResult<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

pub struct Publisher<R: Renderer, T: SiteTree = FsTree> {
    renderer: R,
    history: HistoryManager<T>,
}

impl<R: Renderer> Publisher<R, FsTree> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            history: HistoryManager::new(),
        }
    }
}

impl<R: Renderer, T: SiteTree> Publisher<R, T> {
    pub fn with_history(renderer: R, history: HistoryManager<T>) -> Self {
        Self { renderer, history }
    }

    /// Resolve the configuration, then publish.
    pub async fn run(&self, raw: &RawInputs, ci: CiContext) -> Result<PublishOutcome, StageError> {
        let config = RunConfig::resolve(raw, ci).at(Stage::Validated)?;
        self.publish(&config).await
    }

    /// Publish one run from an already resolved configuration.
    pub async fn publish(&self, config: &RunConfig) -> Result<PublishOutcome, StageError> {
        info!(
            stage = %Stage::Validated,
            run = %config.run_identifier,
            retention_limit = config.retention_limit,
            "Configuration resolved"
        );

        // Render precondition, checked before anything touches the results.
        ensure_results_present(&config.results_dir).at(Stage::Rendered)?;

        self.history.stage_previous_site(config).at(Stage::HistoryMerged)?;
        self.history
            .merge_previous_history(config)
            .at(Stage::HistoryMerged)?;
        write_executor_json(config).at(Stage::HistoryMerged)?;
        info!(stage = %Stage::HistoryMerged, "Results prepared");

        self.renderer
            .render(&config.results_dir, &config.run_output_dir())
            .await
            .at(Stage::Rendered)?;
        info!(
            stage = %Stage::Rendered,
            output = %config.run_output_dir().display(),
            "Report rendered"
        );

        let history_files = update_last_history(config).at(Stage::ContinuityUpdated)?;

        let prune = self.history.prune(config).at(Stage::Pruned)?;
        info!(
            stage = %Stage::Pruned,
            removed = prune.removed.len(),
            failed = prune.failed.len(),
            "Retention pass complete"
        );

        write_index_html(config).at(Stage::Published)?;
        let outputs = PublishOutputs::from_config(config);
        emit_outputs(config, &outputs).at(Stage::Published)?;
        write_summary(config, &outputs).at(Stage::Published)?;
        info!(stage = %Stage::Published, url = %outputs.report_url, "Report published");

        Ok(PublishOutcome {
            outputs,
            prune,
            history_files,
        })
    }
}

/// The results directory must hold something besides what earlier attempts
/// of this pipeline wrote into it.
fn ensure_results_present(dir: &Path) -> PublishResult<()> {
    let empty = || PublishError::EmptyResults {
        path: dir.to_path_buf(),
    };
    if !dir.is_dir() {
        return Err(empty());
    }
    let entries = fs::read_dir(dir).map_err(|e| PublishError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PublishError::io(dir, e))?;
        let name = entry.file_name();
        if !GENERATED_RESULT_ENTRIES.iter().any(|g| name == *g) {
            return Ok(());
        }
    }
    Err(empty())
}
