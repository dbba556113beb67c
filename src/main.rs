// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use drhp_notes::utils::logging::{format_error, format_info, format_success, format_warning};
use drhp_notes::{Config, PipelineEvent, PipelineOrchestrator, ProgressTracker, ReportExporter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "drhp_notes")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Turns DRHP filings into IPO investment notes", long_about = None)]
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
    /// Ingest a DRHP PDF and generate its investment note
    Ingest {
        #[arg(value_name = "PDF")]
        document: PathBuf,
    },

    /// Re-run the checklist and report for an existing company
    Regenerate { company_id: String },

    /// List companies with their processing status
    List,

    /// Print a company's final markdown note
    Show { company_id: String },

    /// Delete a company with its pages, checklist rows, report and index
    Delete {
        company_id: String,

        #[arg(long)]
        confirm: bool,
    },

    /// Write a company's note to a markdown file
    Export {
        company_id: String,

        #[arg(short, long, default_value = "./exports")]
        output: PathBuf,
    },

    /// Check that every required setting is present
    CheckEnv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    drhp_notes::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).context("Failed to load default configuration")?
    };

    match cli.command {
        Commands::CheckEnv => cmd_check_env(&config),
        command => {
            let orchestrator = Arc::new(
                PipelineOrchestrator::from_config(&config)
                    .await
                    .context("Failed to initialize pipeline")?,
            );
            run_command(command, orchestrator, cli.color, cli.verbose).await
        }
    }
}

async fn run_command(
    command: Commands,
    orchestrator: Arc<PipelineOrchestrator>,
    colored: bool,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Ingest { document } => cmd_ingest(orchestrator, document, colored, verbose).await,
        Commands::Regenerate { company_id } => {
            cmd_regenerate(orchestrator, company_id, colored, verbose).await
        }
        Commands::List => cmd_list(&orchestrator).await,
        Commands::Show { company_id } => cmd_show(&orchestrator, &company_id).await,
        Commands::Delete {
            company_id,
            confirm,
        } => cmd_delete(&orchestrator, &company_id, confirm).await,
        Commands::Export { company_id, output } => {
            cmd_export(&orchestrator, &company_id, output).await
        }
        Commands::CheckEnv => Ok(()),
    }
}

fn cmd_check_env(config: &Config) -> Result<()> {
    match config.validate_environment() {
        Ok(()) => {
            println!("{}", format_success("All required settings are present."));
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&e.to_string()));
            Err(anyhow!("environment check failed"))
        }
    }
}

async fn cmd_ingest(
    orchestrator: Arc<PipelineOrchestrator>,
    document: PathBuf,
    colored: bool,
    verbose: bool,
) -> Result<()> {
    info!("Ingesting {}", document.display());
    let (stream, task) = orchestrator.spawn_full_pipeline(document);
    let mut tracker = progress_tracker(colored, verbose);
    let terminal = tracker.track(stream).await;
    let stats = tracker.stats();
    info!(
        "Observed stages {:?} in {:.1}s",
        stats.stages_seen,
        stats.duration.as_secs_f64()
    );
    let summary = task.await.context("Pipeline task failed")?;

    for failure in &summary.cleanup.failures {
        println!(
            "{}",
            format_warning(&format!("cleanup of {}: {}", failure.target, failure.message))
        );
    }
    report_terminal(terminal)
}

async fn cmd_regenerate(
    orchestrator: Arc<PipelineOrchestrator>,
    company_id: String,
    colored: bool,
    verbose: bool,
) -> Result<()> {
    info!("Regenerating note for {}", company_id);
    let (stream, task) = orchestrator.spawn_rerun_pipeline(company_id);
    let terminal = progress_tracker(colored, verbose).track(stream).await;
    task.await.context("Pipeline task failed")?;
    report_terminal(terminal)
}

/// Verbose runs log each stage instead of drawing a bar.
fn progress_tracker(colored: bool, verbose: bool) -> ProgressTracker {
    if verbose {
        ProgressTracker::hidden()
    } else {
        ProgressTracker::new(colored)
    }
}

fn report_terminal(terminal: Option<PipelineEvent>) -> Result<()> {
    match terminal {
        Some(PipelineEvent::Completed {
            message,
            company_id,
            ..
        }) => {
            println!("{}", format_success(&message));
            println!("{}", format_info(&format!("Company id: {}", company_id)));
            Ok(())
        }
        Some(PipelineEvent::Error { message }) => {
            println!("{}", format_error(&message));
            Err(anyhow!(message))
        }
        _ => Err(anyhow!("pipeline ended without a result")),
    }
}

async fn cmd_list(orchestrator: &PipelineOrchestrator) -> Result<()> {
    let companies = orchestrator.list_companies_with_status().await?;

    if companies.is_empty() {
        println!("{}", format_info("No companies ingested yet."));
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&companies)?);
    Ok(())
}

async fn cmd_show(orchestrator: &PipelineOrchestrator, company_id: &str) -> Result<()> {
    match orchestrator.get_final_markdown(company_id).await? {
        Some(markdown) => {
            println!("{}", markdown);
            Ok(())
        }
        None => Err(anyhow!("No report found for company {}", company_id)),
    }
}

async fn cmd_delete(
    orchestrator: &PipelineOrchestrator,
    company_id: &str,
    confirm: bool,
) -> Result<()> {
    if !confirm {
        println!(
            "{}",
            format_warning("This deletes the company and all of its data. Use --confirm to proceed")
        );
        return Ok(());
    }

    if orchestrator
        .delete_company_and_all_data(company_id)
        .await
        .context("Failed to delete company")?
    {
        println!("{}", format_success(&format!("Deleted company {}", company_id)));
    } else {
        println!("{}", format_warning(&format!("Company {} not found", company_id)));
    }
    Ok(())
}

async fn cmd_export(
    orchestrator: &PipelineOrchestrator,
    company_id: &str,
    output: PathBuf,
) -> Result<()> {
    let company = orchestrator
        .get_company(company_id)
        .await?
        .ok_or_else(|| anyhow!("Company {} not found", company_id))?;
    let markdown = orchestrator
        .get_final_markdown(company_id)
        .await?
        .ok_or_else(|| anyhow!("No report found for company {}", company_id))?;

    let exporter = ReportExporter::new(output)?;
    let manifest = exporter.export(&company, &markdown).await?;

    println!(
        "{}",
        format_success(&format!(
            "Exported {} to {}",
            manifest.files.join(", "),
            exporter.output_dir().display()
        ))
    );
    Ok(())
}
