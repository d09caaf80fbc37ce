//! Integration tests for report-publish
//!
//! These drive the compiled binary end to end. The report renderer is
//! replaced by a small shell script passed through `--allure-cmd`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a report-publish Command isolated from the host CI.
fn publish_cmd(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("report-publish");
    cmd.current_dir(dir.path())
        .env("GITHUB_REPOSITORY", "owner/repo")
        .env("GITHUB_REPOSITORY_OWNER", "owner")
        .env("GITHUB_RUN_ID", "1")
        .env("GITHUB_SERVER_URL", "https://github.com")
        .env("GITHUB_WORKFLOW", "CI")
        .env("GITHUB_OUTPUT", dir.path().join("github_output"))
        .env("GITHUB_STEP_SUMMARY", dir.path().join("step_summary"))
        .env_remove("GITHUB_RUN_NUMBER")
        .env_remove("INPUT_RETENTION-LIMIT")
        .env_remove("INPUT_OUTPUT-ROOT")
        .env_remove("INPUT_SITE-BASE-URL");
    cmd
}

/// Helper to create a temp workspace with one raw result file.
fn create_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");
    fs::create_dir_all(&results).unwrap();
    fs::write(results.join("0001-result.json"), r#"{"status":"passed"}"#).unwrap();
    dir
}

/// Write a stand-in renderer. It records the history it was given as
/// `history/seen.json` and emits a new `history/history.json`.
#[cfg(unix)]
fn fake_renderer(dir: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.path().join("fake-allure.sh");
    fs::write(
        &script,
        r#"#!/bin/sh
# invoked as: generate --clean <input> -o <output>
input="$3"
output="$5"
rm -rf "$output"
mkdir -p "$output/history"
echo "report" > "$output/index.html"
if [ -f "$input/history/history.json" ]; then
  cp "$input/history/history.json" "$output/history/seen.json"
fi
echo "{\"run\": \"$(basename "$output")\"}" > "$output/history/history.json"
"#,
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn site_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("site/builds/tests")
}

fn run_folders(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.chars().all(|c| c.is_ascii_digit()))
        .collect();
    names.sort_by_key(|n| n.parse::<u64>().unwrap());
    names
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("report-publish")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("prune"));
    }

    #[test]
    fn test_version() {
        cargo_bin_cmd!("report-publish")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_negative_retention_limit_fails_before_creating_site() {
        let dir = create_workspace();

        publish_cmd(&dir)
            .args(["publish", "--results-dir", "results", "--site-root", "site"])
            .args(["--run-identifier", "1", "--retention-limit=-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("retention-limit"));

        assert!(!dir.path().join("site").exists());
    }

    #[test]
    fn test_output_root_nested_under_another_spelling_is_rejected() {
        let dir = create_workspace();
        fs::create_dir_all(dir.path().join("site/5")).unwrap();
        fs::write(dir.path().join("site/5/index.html"), "old run").unwrap();

        publish_cmd(&dir)
            .args(["publish", "--results-dir", "results", "--site-root", "a/../site"])
            .args(["--output-root", "site/staging", "--run-identifier", "6"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("output-root"));

        assert!(!dir.path().join("site/staging").exists());
    }

    #[test]
    fn test_missing_results_dir_parameter() {
        let dir = create_workspace();

        publish_cmd(&dir)
            .env_remove("INPUT_RESULTS-DIR")
            .args(["publish", "--site-root", "site", "--run-identifier", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("results-dir"));
    }
}

// =============================================================================
// Publishing
// =============================================================================

#[cfg(unix)]
mod publishing {
    use super::*;

    fn publish(dir: &TempDir, renderer: &Path, run: &str, limit: &str) -> assert_cmd::assert::Assert {
        publish_cmd(dir)
            .args(["--results-dir", "results", "--site-root", "site"])
            .args(["--site-path-prefix", "builds/tests"])
            .args(["--run-identifier", run, "--retention-limit", limit])
            .arg("--allure-cmd")
            .arg(renderer)
            .assert()
    }

    #[test]
    fn test_first_publish_creates_run_and_landing_page() {
        let dir = create_workspace();
        let renderer = fake_renderer(&dir);

        publish(&dir, &renderer, "1", "").success();

        let site = site_dir(&dir);
        assert!(site.join("1/index.html").exists());
        assert!(site.join("last-history/history.json").exists());
        let index = fs::read_to_string(site.join("index.html")).unwrap();
        assert!(index.contains("https://owner.github.io/repo/builds/tests/1/index.html"));
        assert!(dir.path().join("results/executor.json").exists());

        let outputs = fs::read_to_string(dir.path().join("github_output")).unwrap();
        assert!(outputs.contains("report-url=https://owner.github.io/repo/builds/tests/1/index.html"));
        assert!(outputs.contains("reports-site-path=builds/tests"));
        assert!(outputs.contains("reports-root-url=https://owner.github.io/repo/builds/tests"));

        let summary = fs::read_to_string(dir.path().join("step_summary")).unwrap();
        assert!(summary.contains("Allure report generated"));
    }

    #[test]
    fn test_history_carries_over_to_next_run() {
        let dir = create_workspace();
        let renderer = fake_renderer(&dir);

        publish(&dir, &renderer, "1", "").success();
        publish(&dir, &renderer, "2", "").success();

        let seen = fs::read_to_string(site_dir(&dir).join("2/history/seen.json")).unwrap();
        assert!(seen.contains(r#""run": "1""#));
        let last = fs::read_to_string(site_dir(&dir).join("last-history/history.json")).unwrap();
        assert!(last.contains(r#""run": "2""#));
    }

    #[test]
    fn test_retention_limit_applies_across_runs() {
        let dir = create_workspace();
        let renderer = fake_renderer(&dir);

        for run in 1..=5 {
            publish(&dir, &renderer, &run.to_string(), "2").success();
        }

        assert_eq!(run_folders(&site_dir(&dir)), vec!["4", "5"]);
    }

    #[test]
    fn test_report_page_anchor_in_outputs() {
        let dir = create_workspace();
        let renderer = fake_renderer(&dir);

        publish_cmd(&dir)
            .args(["publish", "--results-dir", "results", "--site-root", "site"])
            .args(["--site-path-prefix", "builds/tests", "--run-identifier", "1"])
            .args(["--report-page", "behavior"])
            .arg("--allure-cmd")
            .arg(&renderer)
            .assert()
            .success();

        let outputs = fs::read_to_string(dir.path().join("github_output")).unwrap();
        assert!(outputs.contains(
            "report-url=https://owner.github.io/repo/builds/tests/1/index.html#behavior"
        ));
    }

    #[test]
    fn test_renderer_failure_is_fatal_and_publishes_nothing() {
        let dir = create_workspace();

        publish(&dir, Path::new("false"), "1", "")
            .failure()
            .stderr(predicate::str::contains("non-zero"));

        assert!(!site_dir(&dir).join("index.html").exists());
        assert!(!dir.path().join("github_output").exists());
    }

    #[test]
    fn test_empty_results_is_fatal() {
        let dir = create_workspace();
        let renderer = fake_renderer(&dir);
        fs::remove_file(dir.path().join("results/0001-result.json")).unwrap();

        publish(&dir, &renderer, "1", "")
            .failure()
            .stderr(predicate::str::contains("No test results found"));
    }
}

// =============================================================================
// Standalone prune
// =============================================================================

mod prune {
    use super::*;

    fn seed_site(dir: &TempDir) -> PathBuf {
        let site = dir.path().join("site");
        for run in 5..=11 {
            fs::create_dir_all(site.join(run.to_string()).join("history")).unwrap();
        }
        fs::create_dir_all(site.join("last-history")).unwrap();
        fs::write(site.join("index.html"), "<html/>").unwrap();
        fs::write(site.join("CNAME"), "reports.example.com").unwrap();
        site
    }

    #[test]
    fn test_prune_keeps_newest_five_of_seven() {
        let dir = TempDir::new().unwrap();
        let site = seed_site(&dir);

        cargo_bin_cmd!("report-publish")
            .current_dir(dir.path())
            .args(["prune", "--site"])
            .arg(&site)
            .args(["--retention-limit", "5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 2 run(s)."));

        assert_eq!(run_folders(&site), vec!["7", "8", "9", "10", "11"]);
        assert!(site.join("last-history").is_dir());
        assert!(site.join("index.html").exists());
        assert!(site.join("CNAME").exists());
    }

    #[test]
    fn test_prune_dry_run_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        let site = seed_site(&dir);

        cargo_bin_cmd!("report-publish")
            .current_dir(dir.path())
            .args(["prune", "--dry-run", "--site"])
            .arg(&site)
            .args(["--retention-limit", "5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 run(s) would be removed"));

        assert_eq!(run_folders(&site).len(), 7);
    }

    #[test]
    fn test_prune_unlimited_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let site = seed_site(&dir);

        cargo_bin_cmd!("report-publish")
            .current_dir(dir.path())
            .args(["prune", "--site"])
            .arg(&site)
            .args(["--retention-limit", "0"])
            .assert()
            .success();

        assert_eq!(run_folders(&site).len(), 7);
    }

    #[test]
    fn test_prune_rejects_negative_limit() {
        let dir = TempDir::new().unwrap();
        let site = seed_site(&dir);

        cargo_bin_cmd!("report-publish")
            .current_dir(dir.path())
            .args(["prune", "--site"])
            .arg(&site)
            .args(["--retention-limit=-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("retention-limit"));
    }
}
