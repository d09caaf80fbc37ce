//! Standalone retention pass (`report-publish prune`).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use report_publish::config::parse_retention_limit;
use report_publish::history::{ArchivedRun, HistoryManager};

fn modified(run: &ArchivedRun) -> String {
    run.modified_time
        .map(|t| {
            DateTime::<Utc>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

pub fn cmd_prune(
    site: &Path,
    retention_limit: &str,
    protect: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let limit = parse_retention_limit(retention_limit)?;
    if !site.is_dir() {
        anyhow::bail!("Site history {} does not exist", site.display());
    }

    let manager = HistoryManager::new();
    let plan = manager
        .plan(site, limit, protect)
        .with_context(|| format!("Failed to list runs in {}", site.display()))?;

    println!();
    println!("Runs in {} (ordered by {}):", site.display(), plan.ordering);
    println!();
    println!("{:<12} {:<20} Action", "Run", "Modified");
    println!("{:<12} {:<20} ------", "------------", "--------------------");
    for run in &plan.remove {
        let action = if dry_run { "would remove" } else { "remove" };
        println!(
            "{:<12} {:<20} {}",
            run.folder_name,
            modified(run),
            console::style(action).red()
        );
    }
    for run in &plan.keep {
        println!("{:<12} {:<20} keep", run.folder_name, modified(run));
    }
    println!();

    if dry_run {
        println!("Dry run: {} run(s) would be removed.", plan.remove.len());
        return Ok(());
    }

    let report = manager.apply(site, plan);
    println!("Removed {} run(s).", report.removed.len());
    for failure in &report.failed {
        println!(
            "  {} {}: {}",
            console::style("failed").yellow(),
            failure.folder_name,
            failure.error
        );
    }
    Ok(())
}
