//! Landing page and executor metadata.
//!
//! Both files are rendered from templates embedded in the binary:
//! - `index.html` at the published root redirects to the newest run
//! - `executor.json` in the results directory tells the renderer which CI
//!   build produced the report
//!
//! Templates use `{{name}}` placeholders. User-supplied labels (`ci-name`,
//! `report-name`) may contain `{name}` placeholders that are expanded
//! against the run context first.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rust_embed::RustEmbed;
use tracing::info;

use crate::config::RunConfig;
use crate::errors::{PublishError, PublishResult};

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/templates/"]
struct Templates;

static TEMPLATE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").unwrap());

static LABEL_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Values a label placeholder can refer to.
pub fn run_context(config: &RunConfig) -> HashMap<&'static str, String> {
    HashMap::from([
        ("workflow", config.ci.workflow.clone()),
        ("repository", config.ci.repository.clone()),
        ("run_number", config.run_identifier.clone()),
        ("run_id", config.ci.run_id.clone()),
        ("server_url", config.ci.server_url.clone()),
        ("report_url", config.run_url()),
    ])
}

/// Expand `{name}` placeholders. Unknown names are left as written.
pub fn expand_placeholders(text: &str, context: &HashMap<&'static str, String>) -> String {
    LABEL_VAR
        .replace_all(text, |caps: &Captures| match context.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Load an embedded template and substitute `{{name}}` placeholders.
fn render_template(name: &str, vars: &HashMap<&str, String>) -> PublishResult<String> {
    let file = Templates::get(name).ok_or_else(|| {
        PublishError::io(
            name,
            std::io::Error::new(std::io::ErrorKind::NotFound, "template not embedded"),
        )
    })?;
    let source = String::from_utf8_lossy(&file.data);
    Ok(TEMPLATE_VAR
        .replace_all(&source, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn write_file(path: &Path, content: &str) -> PublishResult<()> {
    fs::write(path, content).map_err(|e| PublishError::write(path, e))
}

/// Render the redirect page contents for `url`.
pub fn render_index_html(url: &str) -> PublishResult<String> {
    let vars = HashMap::from([("url", escape_html(url))]);
    render_template("index.html", &vars)
}

/// Render executor.json contents for this run.
pub fn render_executor_json(config: &RunConfig) -> PublishResult<String> {
    let context = run_context(config);
    let ci_name = expand_placeholders(&config.ci_name, &context);
    let report_name = expand_placeholders(&config.report_name, &context);
    let build_url = format!(
        "{}/{}/actions/runs/{}",
        config.ci.server_url.trim_end_matches('/'),
        config.ci.repository,
        config.ci.run_id
    );

    // buildOrder is numeric for numeric run identifiers
    let run_number = match config.run_identifier.parse::<u64>() {
        Ok(n) => n.to_string(),
        Err(_) => json_string(&config.run_identifier),
    };

    let vars = HashMap::from([
        ("ci_name", json_string(&ci_name)),
        ("server_url", json_string(&config.ci.server_url)),
        ("run_number", run_number),
        (
            "build_name",
            json_string(&format!("{} #{}", ci_name, config.run_identifier)),
        ),
        ("build_url", json_string(&build_url)),
        ("report_url", json_string(&config.run_url())),
        ("report_name", json_string(&report_name)),
    ]);
    render_template("executor.json", &vars)
}

/// Write `{results_dir}/executor.json`.
pub fn write_executor_json(config: &RunConfig) -> PublishResult<PathBuf> {
    let path = config.results_dir.join("executor.json");
    write_file(&path, &render_executor_json(config)?)?;
    info!(path = %path.display(), "Wrote executor metadata");
    Ok(path)
}

/// Write `{output_root}/index.html` redirecting to the new run.
pub fn write_index_html(config: &RunConfig) -> PublishResult<PathBuf> {
    let path = config.output_root.join("index.html");
    write_file(&path, &render_index_html(&config.report_url())?)?;
    info!(path = %path.display(), target = %config.report_url(), "Wrote landing page");
    Ok(path)
}
