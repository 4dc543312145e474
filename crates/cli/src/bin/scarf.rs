use analysis::{AnalysisMachine, AnalysisSnapshot, AnalysisState, Notice};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::follow::{Followed, follow};
use cli::{AppConfig, logging, render};
use client::UploadFile;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

/// Research paper analysis against the SCARF backend
#[derive(Parser, Debug)]
#[command(name = "scarf", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF and follow its analysis until it finishes
    Analyze {
        pdf: PathBuf,

        /// Print the final snapshot and poll metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Map a saved backend report into the view model, offline
    Map {
        report: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze { pdf, json } => analyze(&config, &pdf, json).await,
        Command::Map { report, json } => {
            map(&report, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(config: &AppConfig, pdf: &Path, json: bool) -> Result<ExitCode> {
    let file = UploadFile::from_path(pdf)
        .await
        .with_context(|| format!("Failed to read {}", pdf.display()))?;
    let client = config.scarf_client()?;
    info!(backend = client.base_url(), file = %file.name, "Starting analysis");

    let mut machine = AnalysisMachine::new(client, config.polling.clone());
    let mut updates = machine.subscribe();

    if let Err(e) = machine.start_analysis(file).await {
        eprintln!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    let mut last_line = String::new();
    let mut last_claims = 0;
    let outcome = follow(&mut updates, tokio::signal::ctrl_c(), |snap| {
        if json {
            return;
        }
        let line = render::progress_line(snap);
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
        let claims = snap.claim_count();
        if snap.state == AnalysisState::Analyzing && claims != last_claims {
            println!(
                "       partial results: {} claims ({})",
                claims,
                snap.stage.as_deref().unwrap_or("in progress")
            );
            last_claims = claims;
        }
    })
    .await;

    let snap = match outcome {
        Followed::Settled(snap) => snap,
        Followed::Interrupted => {
            warn!("Interrupted, cancelling analysis");
            machine.reset();
            return Ok(ExitCode::from(130));
        }
    };

    if json {
        let out = serde_json::json!({
            "snapshot": &snap,
            "metrics": machine.metrics(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_outcome(&snap);
    }

    Ok(match snap.state {
        AnalysisState::Complete => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn print_outcome(snap: &AnalysisSnapshot) {
    match snap.state {
        AnalysisState::Complete => {
            if snap.notice == Some(Notice::NoClaimsFound) {
                println!("\nNo claims found in the document.");
            }
            if let Some(report) = &snap.report {
                println!("\n{}", render::report_text(report));
            }
        }
        _ => {
            eprintln!(
                "Analysis failed: {}",
                snap.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn map(path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let mapped = report::map_report(&payload);
    if json {
        println!("{}", serde_json::to_string_pretty(&mapped)?);
    } else {
        print!("{}", render::report_text(&mapped.data));
        print!("\n{}", render::defaults_text(&mapped.defaults));
    }
    Ok(())
}
