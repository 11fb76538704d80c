use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use commerce_migrator as migrator;
use migrator::config::MigratorConfig;
use migrator::services::{sanity, PhaseName, PhaseOutcome, PhaseReport, StatusStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Manufacturers and order statuses
    #[value(name = "phase1")]
    Phase1,
    /// Customers with addresses and wishlists
    #[value(name = "phase4")]
    Phase4,
    /// Category tree
    #[value(name = "phase5")]
    Phase5,
    /// Products with their catalog relations
    #[value(name = "phase6")]
    Phase6,
    /// Confirmed orders with lines and options
    #[value(name = "phase7")]
    Phase7,
    /// Every phase in order, stopping at the first failure
    All,
    /// Read-only schema and connectivity checks
    Check,
    /// Phase status records and overall progress
    Status,
}

impl Command {
    fn phases(self) -> Vec<PhaseName> {
        match self {
            Command::Phase1 => vec![PhaseName::Lookups],
            Command::Phase4 => vec![PhaseName::Users],
            Command::Phase5 => vec![PhaseName::Catalog],
            Command::Phase6 => vec![PhaseName::Products],
            Command::Phase7 => vec![PhaseName::Orders],
            Command::All => PhaseName::all(),
            Command::Check | Command::Status => Vec::new(),
        }
    }
}

#[derive(Parser)]
#[command(
    name = "commerce-migrate",
    about = "Phased migration of a storefront database into a document store",
    version
)]
struct Cli {
    #[arg(value_enum, help = "Phase to run, or all, check or status")]
    command: Command,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Reset the phase status and drop its collections before running"
    )]
    reset: bool,
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..=10_000),
        help = "Rows per batch; overrides configuration"
    )]
    batch_size: Option<u64>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Run phases even when their collections already hold documents"
    )]
    no_skip: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match migrator::config::load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(batch_size) = cli.batch_size {
        cfg.batch_size = batch_size;
    }
    if cli.no_skip {
        cfg.skip_existing = false;
    }
    migrator::config::init_tracing(cfg.log_level(), cfg.log_json || cfg.is_production());
    info!(
        environment = %cfg.environment,
        batch_size = cfg.batch_size,
        skip_existing = cfg.skip_existing,
        memory_target = cfg.uses_memory_target(),
        "Configuration loaded"
    );

    match run(&cli, &cfg).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, cfg: &MigratorConfig) -> Result<bool> {
    match cli.command {
        Command::Check => check(cfg, cli.json).await,
        Command::Status => status(cfg, cli.json).await,
        command => migrate(cfg, command.phases(), cli.reset, cli.json).await,
    }
}

async fn migrate(cfg: &MigratorConfig, phases: Vec<PhaseName>, reset: bool, json: bool) -> Result<bool> {
    let orchestrator = migrator::connect(cfg)
        .await
        .context("failed to connect to the source or target store")?;

    if reset {
        for phase in &phases {
            let removed = orchestrator.reset_phase(*phase).await?;
            warn!(phase = %phase, removed, "Phase reset before run");
        }
    }

    let mut reports: Vec<PhaseReport> = Vec::with_capacity(phases.len());
    for phase in phases {
        match orchestrator.run_phase(phase).await {
            Ok(report) => {
                if !json {
                    render_phase(&report);
                }
                reports.push(report);
            }
            Err(err) => {
                if json {
                    print_json(&serde_json::json!({
                        "phases": reports,
                        "failed": phase,
                        "error": err.to_string(),
                        "critical": err.is_critical(),
                    }))?;
                } else {
                    eprintln!("Phase {phase} failed: {err}");
                }
                return Ok(false);
            }
        }
    }

    if json {
        print_json(&serde_json::json!({ "phases": reports }))?;
    }
    info!(phases = reports.len(), "Migration finished");
    Ok(true)
}

async fn check(cfg: &MigratorConfig, json: bool) -> Result<bool> {
    let source = migrator::db::establish_connection_with_config(&migrator::db::DbConfig::source(cfg))
        .await
        .context("failed to connect to the source store")?;
    let target = migrator::store::connect_target(cfg, false)
        .await
        .context("failed to connect to the target store")?;

    let report = sanity::run_checks(&source, target.as_ref()).await;
    migrator::db::close_pool(source).await?;
    if json {
        print_json(&report)?;
    } else {
        for check in &report.checks {
            match &check.detail {
                Some(detail) => println!("[FAIL] {} - {}", check.name, detail),
                None => println!("[ OK ] {}", check.name),
            }
        }
        println!(
            "{} checks, {} failed",
            report.checks.len(),
            report.failures().count()
        );
    }
    Ok(report.ok())
}

async fn status(cfg: &MigratorConfig, json: bool) -> Result<bool> {
    let target = migrator::store::connect_target(cfg, false)
        .await
        .context("failed to connect to the target store")?;
    let report = StatusStore::new(target).report(&PhaseName::known()).await?;

    if json {
        print_json(&report)?;
        return Ok(true);
    }
    for view in &report.phases {
        let record = &view.record;
        println!(
            "{:<8} {:<10} processed={} succeeded={} failed={} success_rate={} last_run={}",
            record.name,
            record.status,
            record.processed,
            record.succeeded,
            record.failed,
            view.success_rate
                .map(|r| format!("{r:.1}%"))
                .unwrap_or_else(|| "-".to_string()),
            record
                .last_run
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        );
        if let Some(err) = &record.error {
            println!("         error: {err}");
        }
    }
    println!(
        "{} of {} phases completed ({:.0}%)",
        report.completed, report.known, report.progress_percent
    );
    Ok(true)
}

fn render_phase(report: &PhaseReport) {
    match report.outcome {
        PhaseOutcome::Skipped => println!("{} ({}): skipped", report.phase, report.phase.title()),
        PhaseOutcome::Completed => {
            println!(
                "{} ({}): completed in {:.1}s",
                report.phase,
                report.phase.title(),
                report.duration_seconds
            );
            for entity in &report.entities {
                println!(
                    "  - {}: processed={} succeeded={} failed={} skipped={} batches={}",
                    entity.collection,
                    entity.counters.processed,
                    entity.counters.succeeded,
                    entity.counters.failed,
                    entity.counters.skipped,
                    entity.batches
                );
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
