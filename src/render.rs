//! Report renderer seam.
//!
//! The renderer is an opaque external tool: given a results directory and an
//! output directory it produces a report tree containing a fresh `history/`
//! fragment. [`AllureCli`] shells out to `allure generate --clean`; tests
//! substitute their own [`Renderer`].

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::errors::{PublishError, PublishResult};

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `input` into `output`, replacing whatever `output` held.
    async fn render(&self, input: &Path, output: &Path) -> PublishResult<()>;
}

/// Renders by running the Allure command line.
#[derive(Debug, Clone)]
pub struct AllureCli {
    program: String,
}

impl AllureCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed after the program name.
    pub fn args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "generate".to_string(),
            "--clean".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl Renderer for AllureCli {
    async fn render(&self, input: &Path, output: &Path) -> PublishResult<()> {
        info!(
            "Generating report from {} to {} ...",
            input.display(),
            output.display()
        );

        // Renderer output passes straight through to our own stdout/stderr.
        let status = Command::new(&self.program)
            .args(Self::args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| PublishError::RenderSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PublishError::RenderFailed {
                exit_code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}
