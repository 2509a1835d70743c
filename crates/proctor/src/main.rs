//! Exam Session Host - Main Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use proctor::{init_logging, init_metrics, run_replay, ReplayArgs, Settings};
use tracing::info;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Exam session integrity host")]
struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session over recorded perception output
    Replay {
        /// JSON-lines file, one frame per line
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        candidate: String,
        /// Write the JSON report here
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the CSV report here
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        no_face_model: bool,
        #[arg(long)]
        no_object_model: bool,
    },
    /// Print the effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.cmd {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Commands::Replay {
            input,
            candidate,
            json,
            csv,
            no_face_model,
            no_object_model,
        } => {
            init_logging(&settings.logging)?;
            init_metrics(&settings.metrics)?;
            info!("=== Proctor v{} ===", env!("CARGO_PKG_VERSION"));

            let args = ReplayArgs {
                input,
                candidate,
                json,
                csv,
                no_face_model,
                no_object_model,
            };
            let outcome = run_replay(&settings, &args).await?;
            let report = &outcome.report;
            println!(
                "{}: score {} over {} ({} events, detection {})",
                report.candidate_name,
                report.integrity_score,
                report.duration,
                report.counts.total(),
                report.detection_status.as_str()
            );
        }
    }

    Ok(())
}
