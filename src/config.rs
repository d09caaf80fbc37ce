//! Run configuration.
//!
//! Inputs arrive as strings from the CLI or from `INPUT_*` environment
//! variables (see [`RawInputs`]); run context comes from the CI runner
//! (see [`CiContext`]). [`RunConfig::validate`] turns both into an immutable
//! [`RunConfig`] without modifying the filesystem, and [`RunConfig::resolve`]
//! additionally creates the site directories.

use std::path::{Component, Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::errors::{PublishError, PublishResult};
use crate::fsutil::ensure_dir;
use crate::history::retention::SENTINEL_NAMES;

/// Name of the cross-run continuity fragment directory.
pub const LAST_HISTORY_DIR: &str = "last-history";

pub const DEFAULT_CI_NAME: &str = "GitHub Action: {workflow}";
pub const DEFAULT_REPORT_NAME: &str = "Allure Report";
pub const DEFAULT_SUMMARY: &str = "# Allure report generated.\nHave a nice day!";
pub const DEFAULT_RENDERER_CMD: &str = "allure";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Unvalidated publish inputs. Empty strings mean "not supplied".
#[derive(Debug, Clone, Default, Args)]
pub struct RawInputs {
    /// Directory of raw test results to render
    #[arg(long, env = "INPUT_RESULTS-DIR", default_value = "")]
    pub results_dir: String,

    /// Root of the persistent published site
    #[arg(long, env = "INPUT_SITE-ROOT", default_value = "")]
    pub site_root: String,

    /// Sub-path under the site root for this report family
    #[arg(long, env = "INPUT_SITE-PATH-PREFIX", default_value = "")]
    pub site_path_prefix: String,

    /// Where the new run is rendered (defaults to site root + prefix)
    #[arg(long, env = "INPUT_OUTPUT-ROOT", default_value = "")]
    pub output_root: String,

    /// Public base URL of the site (derived from the repository when empty)
    #[arg(long, env = "INPUT_SITE-BASE-URL", default_value = "")]
    pub site_base_url: String,

    /// Maximum archived runs to keep; 0 or empty keeps everything
    #[arg(long, env = "INPUT_RETENTION-LIMIT", default_value = "", allow_hyphen_values = true)]
    pub retention_limit: String,

    /// Identifier of this run, used as its folder name
    #[arg(long, env = "GITHUB_RUN_NUMBER", default_value = "")]
    pub run_identifier: String,

    /// CI label written to executor.json; supports {placeholders}
    #[arg(long, env = "INPUT_CI-NAME", default_value = "")]
    pub ci_name: String,

    /// Report title written to executor.json; supports {placeholders}
    #[arg(long, env = "INPUT_REPORT-NAME", default_value = "")]
    pub report_name: String,

    /// In-report anchor appended to the redirect target
    #[arg(long, env = "INPUT_REPORT-PAGE", default_value = "")]
    pub report_page: String,

    /// Step summary text
    #[arg(long, env = "INPUT_SUMMARY", default_value = "")]
    pub summary: String,

    /// Do not append a step summary
    #[arg(long, env = "INPUT_NO-SUMMARY")]
    pub no_summary: bool,

    /// Report renderer executable
    #[arg(long, env = "ALLURE_CMD", default_value = DEFAULT_RENDERER_CMD)]
    pub allure_cmd: String,
}

/// Identity of the CI run, read from the runner environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    /// `owner/repo`
    pub repository: String,
    pub repository_owner: String,
    pub run_id: String,
    pub server_url: String,
    pub workflow: String,
    /// File receiving `key=value` outputs
    pub output_file: Option<PathBuf>,
    /// File receiving the markdown step summary
    pub step_summary: Option<PathBuf>,
}

impl CiContext {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the context from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let server_url = get("GITHUB_SERVER_URL");
        Self {
            repository: get("GITHUB_REPOSITORY"),
            repository_owner: get("GITHUB_REPOSITORY_OWNER"),
            run_id: get("GITHUB_RUN_ID"),
            server_url: if server_url.is_empty() {
                DEFAULT_SERVER_URL.to_string()
            } else {
                server_url
            },
            workflow: get("GITHUB_WORKFLOW"),
            output_file: path("GITHUB_OUTPUT"),
            step_summary: path("GITHUB_STEP_SUMMARY"),
        }
    }

    /// Repository name without the owner part.
    pub fn repository_name(&self) -> &str {
        self.repository.rsplit('/').next().unwrap_or_default()
    }

    /// Owner login, falling back to the `owner/` part of the repository.
    pub fn owner(&self) -> &str {
        if !self.repository_owner.is_empty() {
            &self.repository_owner
        } else {
            self.repository.split('/').next().unwrap_or_default()
        }
    }
}

/// Resolved, immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub results_dir: PathBuf,
    pub site_root: PathBuf,
    pub site_path_prefix: Option<String>,
    /// `site_root/prefix`: where the previous publication lives
    pub history_root: PathBuf,
    /// Where the new run is rendered and the published tree is assembled
    pub output_root: PathBuf,
    /// 0 means unlimited
    pub retention_limit: usize,
    pub run_identifier: String,
    /// Base URL without the prefix
    pub site_base_url: String,
    pub ci_name: String,
    pub report_name: String,
    pub report_page: Option<String>,
    /// `None` disables the step summary
    pub summary: Option<String>,
    pub renderer_cmd: String,
    pub ci: CiContext,
}

impl RunConfig {
    /// Validate inputs without modifying the filesystem.
    ///
    /// The output-root check reads the filesystem to resolve symlinks.
    pub fn validate(raw: &RawInputs, ci: CiContext) -> PublishResult<Self> {
        let results_dir = required_path("results-dir", &raw.results_dir)?;
        let site_root = required_path("site-root", &raw.site_root)?;
        let retention_limit = parse_retention_limit(&raw.retention_limit)?;

        let run_identifier = raw.run_identifier.trim().to_string();
        if !is_single_segment(&run_identifier) {
            return Err(PublishError::config(
                "run-identifier",
                format!(
                    "`{}` must be a non-empty single path segment",
                    run_identifier
                ),
            ));
        }
        if SENTINEL_NAMES.contains(&run_identifier.as_str()) {
            return Err(PublishError::config(
                "run-identifier",
                format!("`{}` is reserved in the site history", run_identifier),
            ));
        }

        let site_path_prefix = normalize_prefix(&raw.site_path_prefix)?;
        let history_root = match &site_path_prefix {
            Some(prefix) => site_root.join(prefix),
            None => site_root.clone(),
        };

        let output_root = match raw.output_root.trim() {
            "" => history_root.clone(),
            other => PathBuf::from(other),
        };
        let real_output = real_path(&output_root)?;
        let real_history = real_path(&history_root)?;
        // a second spelling of the history root is an in-place publish
        let output_root = if real_output == real_history {
            history_root.clone()
        } else {
            output_root
        };
        if real_output != real_history
            && (real_output.starts_with(&real_history) || real_history.starts_with(&real_output))
        {
            return Err(PublishError::config(
                "output-root",
                format!(
                    "`{}` must not be nested with the site history at `{}`",
                    output_root.display(),
                    history_root.display()
                ),
            ));
        }

        let site_base_url = match raw.site_base_url.trim() {
            "" => derive_base_url(&ci)?,
            url => url.trim_end_matches('/').to_string(),
        };

        let ci_name = non_empty_or(&raw.ci_name, DEFAULT_CI_NAME);
        let report_name = non_empty_or(&raw.report_name, DEFAULT_REPORT_NAME);
        let report_page = Some(raw.report_page.trim().trim_start_matches('#'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let summary = if raw.no_summary {
            None
        } else {
            Some(non_empty_or(&raw.summary, DEFAULT_SUMMARY))
        };

        Ok(Self {
            results_dir,
            site_root,
            site_path_prefix,
            history_root,
            output_root,
            retention_limit,
            run_identifier,
            site_base_url,
            ci_name,
            report_name,
            report_page,
            summary,
            renderer_cmd: non_empty_or(&raw.allure_cmd, DEFAULT_RENDERER_CMD),
            ci,
        })
    }

    /// Validate inputs, then create the site directories.
    pub fn resolve(raw: &RawInputs, ci: CiContext) -> PublishResult<Self> {
        let config = Self::validate(raw, ci)?;
        config.ensure_directories()?;
        Ok(config)
    }

    /// Create the site root, the prefixed history root and the output root.
    pub fn ensure_directories(&self) -> PublishResult<()> {
        ensure_dir(&self.site_root)?;
        ensure_dir(&self.history_root)?;
        ensure_dir(&self.output_root)?;
        debug!(
            history_root = %self.history_root.display(),
            output_root = %self.output_root.display(),
            "Site directories ready"
        );
        Ok(())
    }

    /// True when the new run is rendered straight into the site history.
    pub fn is_in_place(&self) -> bool {
        self.output_root == self.history_root
    }

    /// Folder the new run is rendered into.
    pub fn run_output_dir(&self) -> PathBuf {
        self.output_root.join(&self.run_identifier)
    }

    /// Continuity fragment left by the previous publication.
    pub fn previous_last_history(&self) -> PathBuf {
        self.history_root.join(LAST_HISTORY_DIR)
    }

    /// Continuity fragment of the tree being published.
    pub fn published_last_history(&self) -> PathBuf {
        self.output_root.join(LAST_HISTORY_DIR)
    }

    /// History fragment placed into the renderer's input.
    pub fn results_history_dir(&self) -> PathBuf {
        self.results_dir.join("history")
    }

    /// Public URL of the reports root, including the path prefix.
    pub fn root_url(&self) -> String {
        match &self.site_path_prefix {
            Some(prefix) => format!("{}/{}", self.site_base_url, prefix),
            None => self.site_base_url.clone(),
        }
    }

    /// Public URL of the new run's folder, with a trailing slash.
    pub fn run_url(&self) -> String {
        format!("{}/{}/", self.root_url(), self.run_identifier)
    }

    /// Public URL of the new run's landing page, including any anchor.
    pub fn report_url(&self) -> String {
        let url = format!("{}index.html", self.run_url());
        match &self.report_page {
            Some(page) => format!("{}#{}", url, page),
            None => url,
        }
    }
}

fn required_path(field: &'static str, value: &str) -> PublishResult<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PublishError::config(field, "cannot be empty"));
    }
    Ok(PathBuf::from(value))
}

/// Parse the retention limit. Empty means unlimited (0).
pub fn parse_retention_limit(value: &str) -> PublishResult<usize> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    let parsed: i64 = value.parse().map_err(|_| {
        PublishError::config("retention-limit", format!("`{}` is not an integer", value))
    })?;
    if parsed < 0 {
        return Err(PublishError::config("retention-limit", "cannot be negative"));
    }
    usize::try_from(parsed)
        .map_err(|_| PublishError::config("retention-limit", format!("`{}` is too large", value)))
}

/// Strip surrounding slashes and reject prefixes that escape the site root.
fn normalize_prefix(value: &str) -> PublishResult<Option<String>> {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let escapes = Path::new(trimmed)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(PublishError::config(
            "site-path-prefix",
            format!("`{}` must be a relative path below the site root", trimmed),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

/// Absolute spelling of `path` with symlinks resolved for the part that
/// exists. `.` and `..` in the rest are folded lexically.
fn real_path(path: &Path) -> PublishResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| PublishError::io(path, e))?;
    let folded = fold_dots(&absolute);

    let mut existing = folded.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(mut real) = existing.canonicalize() {
            real.extend(missing.iter().rev());
            return Ok(real);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(folded),
        }
    }
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

fn is_single_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains('/')
        && !value.contains('\\')
}

fn derive_base_url(ci: &CiContext) -> PublishResult<String> {
    let owner = ci.owner();
    let repo = ci.repository_name();
    if owner.is_empty() || repo.is_empty() {
        return Err(PublishError::config(
            "site-base-url",
            "not set and GITHUB_REPOSITORY is unavailable to derive it",
        ));
    }
    Ok(format!("https://{}.github.io/{}", owner, repo))
}

fn non_empty_or(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
