//! Machine-readable outputs and the human-readable step summary.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::errors::{PublishError, PublishResult};

/// Values handed to downstream CI steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublishOutputs {
    pub report_url: String,
    pub reports_root_url: String,
    pub reports_site_path: String,
    pub reports_site: String,
}

impl PublishOutputs {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            report_url: config.report_url(),
            reports_root_url: config.root_url(),
            reports_site_path: config.site_path_prefix.clone().unwrap_or_default(),
            reports_site: config.output_root.display().to_string(),
        }
    }

    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("report-url", self.report_url.as_str()),
            ("reports-root-url", self.reports_root_url.as_str()),
            ("reports-site-path", self.reports_site_path.as_str()),
            ("reports-site", self.reports_site.as_str()),
        ]
    }

    /// `key=value` lines, one per output.
    pub fn to_lines(&self) -> String {
        self.pairs()
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()
    }
}

fn append(path: &Path, content: &str) -> PublishResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PublishError::write(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| PublishError::write(path, e))
}

/// Append outputs to the CI output file, or print them when there is none.
pub fn emit_outputs(config: &RunConfig, outputs: &PublishOutputs) -> PublishResult<()> {
    match &config.ci.output_file {
        Some(path) => {
            append(path, &outputs.to_lines())?;
            info!(path = %path.display(), "Wrote outputs");
        }
        None => print!("{}", outputs.to_lines()),
    }
    Ok(())
}

/// Markdown appended to the step summary.
pub fn summary_text(summary: &str, report_url: &str) -> String {
    format!("{}\n\n[Open the report]({})\n", summary.trim_end(), report_url)
}

/// Append the step summary. Returns false when disabled or there is no
/// summary file.
pub fn write_summary(config: &RunConfig, outputs: &PublishOutputs) -> PublishResult<bool> {
    let (Some(summary), Some(path)) = (&config.summary, &config.ci.step_summary) else {
        return Ok(false);
    };
    append(path, &summary_text(summary, &outputs.report_url))?;
    Ok(true)
}
