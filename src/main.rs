// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use medsearch_pipeline::utils::logging::{format_error, format_success, format_warning};
use medsearch_pipeline::{Config, PipelineContext, PipelineOrchestrator, read_keys_file};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "medsearch_pipeline")]
#[command(version)]
#[command(about = "Embedding reindex and ATC classification jobs for an OpenSearch drug-label corpus", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy missing records into the destination index with embeddings attached
    Reindex,

    /// Resolve every RxCUI to its ATC codes and write the mapping snapshot
    Classify {
        /// Read keys from a file (one per line) instead of scanning the corpus
        #[arg(long, value_name = "FILE")]
        keys_file: Option<PathBuf>,

        /// Write the snapshot here instead of the configured path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check the store, both indices and the embedding service
    Verify,

    /// Show document counts of the source and destination indices
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    medsearch_pipeline::utils::logging::init_logger(cli.color, cli.verbose);

    info!("MedSearch pipeline");
    info!("Loading configuration from: {}", cli.config.display());

    let file = if cli.config.exists() {
        Some(cli.config.as_path())
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
        None
    };
    let mut config = Config::load(file).context("Failed to load configuration")?;

    if let Commands::Classify {
        output: Some(output),
        ..
    } = &cli.command
    {
        config.classification.snapshot_path = output.clone();
    }

    let context = PipelineContext::from_config(config).context("Failed to initialise pipeline")?;
    let cancel = shutdown_token();

    match cli.command {
        Commands::Reindex => {
            cmd_reindex(&context, cli.color, &cancel).await?;
        }
        Commands::Classify { keys_file, .. } => {
            cmd_classify(&context, cli.color, keys_file, &cancel).await?;
        }
        Commands::Verify => {
            cmd_verify(&context).await?;
        }
        Commands::Stats => {
            cmd_stats(&context).await?;
        }
    }

    Ok(())
}

/// Token cancelled on the first Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            trigger.cancel();
        }
    });
    cancel
}

async fn cmd_reindex(context: &PipelineContext, color: bool, cancel: &CancellationToken) -> Result<()> {
    let report = PipelineOrchestrator::new(context)
        .with_progress(color)
        .run_reindex(cancel)
        .await
        .context("Reindex failed")?;

    let summary = &report.summary;
    println!(
        "{}",
        format_success(&format!("Done. {} documents indexed.", summary.succeeded()))
    );
    if summary.failed() > 0 {
        println!(
            "{}",
            format_error(&format!("{} errors occurred.", summary.failed()))
        );
    }
    println!(
        "attempted: {}  succeeded: {}  failed: {}  skipped: {}",
        summary.attempted(),
        summary.succeeded(),
        summary.failed(),
        report.stats.skipped()
    );
    if report.cancelled {
        println!(
            "{}",
            format_warning("Run was interrupted; re-run to index the remainder.")
        );
    }

    Ok(())
}

async fn cmd_classify(
    context: &PipelineContext,
    color: bool,
    keys_file: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<()> {
    let keys = match keys_file {
        Some(path) => Some(
            read_keys_file(&path)
                .with_context(|| format!("Failed to read keys from {}", path.display()))?,
        ),
        None => None,
    };

    let report = PipelineOrchestrator::new(context)
        .with_progress(color)
        .run_classification(keys, cancel)
        .await
        .context("Classification failed")?;

    println!("Total keys: {}", report.total_keys());
    println!("Resolved: {}", report.mapping.resolved_count());
    if report.cancelled {
        println!(
            "{}",
            format_warning(&format!(
                "Run was interrupted; {} left unchanged.",
                report.snapshot_path.display()
            ))
        );
    } else {
        println!(
            "{}",
            format_success(&format!(
                "Mapping saved to {}",
                report.snapshot_path.display()
            ))
        );
    }

    Ok(())
}

async fn cmd_verify(context: &PipelineContext) -> Result<()> {
    info!("Verifying store and encoder");

    let report = PipelineOrchestrator::new(context).verify().await;
    println!("{}", report.format());

    if !report.is_usable() {
        return Err(anyhow::anyhow!("Health check failed"));
    }

    Ok(())
}

async fn cmd_stats(context: &PipelineContext) -> Result<()> {
    info!("Gathering statistics");

    for store in [&context.source, &context.destination] {
        let count = store
            .count()
            .await
            .with_context(|| format!("Failed to count {}", store.index_name()))?;
        println!("{}: {} documents", store.index_name(), count);
    }

    Ok(())
}
