//! Publish a new run. This is the default command.

use anyhow::Result;

use report_publish::config::{CiContext, DEFAULT_RENDERER_CMD, RawInputs};
use report_publish::render::AllureCli;
use report_publish::Publisher;

pub async fn cmd_publish(inputs: &RawInputs) -> Result<()> {
    let program = match inputs.allure_cmd.trim() {
        "" => DEFAULT_RENDERER_CMD,
        cmd => cmd,
    };
    let publisher = Publisher::new(AllureCli::new(program));
    let outcome = publisher.run(inputs, CiContext::from_env()).await?;

    eprintln!();
    eprintln!(
        "{} {}",
        console::style("Published").green().bold(),
        outcome.outputs.report_url
    );
    if !outcome.prune.removed.is_empty() {
        eprintln!(
            "  Removed {} old run(s): {}",
            outcome.prune.removed.len(),
            outcome.prune.removed.join(", ")
        );
    }
    for failure in &outcome.prune.failed {
        eprintln!(
            "  {} could not remove {}: {}",
            console::style("warning:").yellow(),
            failure.folder_name,
            failure.error
        );
    }
    Ok(())
}
