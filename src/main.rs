use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use report_publish::RawInputs;

mod cmd;

#[derive(Parser)]
#[command(name = "report-publish")]
#[command(version, about = "Publish test reports into a static site history")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Publish inputs used when no subcommand is given
    #[command(flatten)]
    pub publish: RawInputs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the results and publish them as a new run (the default)
    Publish(RawInputs),
    /// Apply the retention limit to an existing site history
    Prune {
        /// History root holding the run folders
        #[arg(long)]
        site: PathBuf,

        /// Maximum run folders to keep; 0 keeps everything
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        retention_limit: String,

        /// Run folder that must never be removed
        #[arg(long)]
        protect: Option<String>,

        /// Show what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads its env fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);
    tracing::info!("report-publish v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        None => cmd::cmd_publish(&cli.publish).await?,
        Some(Commands::Publish(inputs)) => cmd::cmd_publish(inputs).await?,
        Some(Commands::Prune {
            site,
            retention_limit,
            protect,
            dry_run,
        }) => cmd::cmd_prune(site, retention_limit, protect.as_deref(), *dry_run)?,
    }

    Ok(())
}
