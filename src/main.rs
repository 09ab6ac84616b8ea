//! Main entry point for the cricket ratings batch job
//!
//! Loads configuration and team tables, takes the run lock on the snapshot
//! table and performs one incremental run, full recompute or verification.

use anyhow::Result;
use clap::Parser;
use cricket_ratings::config::{AppConfig, TeamTables};
use cricket_ratings::engine::{render_leaderboard, ResumeCoordinator, RunOptions};
use cricket_ratings::persistence::{JsonFileSnapshotRepository, RunLock};
use cricket_ratings::source::CsvMatchSource;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Cricket Ratings - chronological Elo ratings for cricket teams
#[derive(Parser)]
#[command(
    name = "cricket-ratings",
    version,
    about = "Replay a cricket match log and persist pre-match Elo ratings",
    long_about = "Cricket Ratings processes a historical match log in date order, rating every \
                 canonical team with integer Elo and storing both teams' pre-match ratings for \
                 each match. By default it resumes from the earliest match without a snapshot."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Match log override
    #[arg(long, value_name = "FILE", help = "Override match log CSV path")]
    matches: Option<PathBuf>,

    /// Snapshot table override
    #[arg(long, value_name = "FILE", help = "Override snapshot table path")]
    snapshots: Option<PathBuf>,

    /// Team tables override
    #[arg(long, value_name = "FILE", help = "Override team tables path (TOML)")]
    tables: Option<PathBuf>,

    /// Recompute everything
    #[arg(long, help = "Recompute every snapshot from initial ratings")]
    full: bool,

    /// Verify instead of processing
    #[arg(
        long,
        conflicts_with = "full",
        help = "Replay the log in memory and compare with the stored snapshots"
    )]
    verify: bool,

    /// Print a leaderboard
    #[arg(
        long,
        value_name = "N",
        help = "Print the top N teams after the run (0 for all)"
    )]
    leaderboard: Option<usize>,

    /// Print a team's rating history
    #[arg(long, value_name = "TEAM", help = "Print the stored rating history of a team")]
    history: Option<String>,

    /// Print collected metrics
    #[arg(long, help = "Print Prometheus metrics after the run")]
    metrics: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode
    #[arg(
        long,
        help = "Process into a scratch table and discard the snapshots"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(matches) = &args.matches {
        config.storage.matches_path = matches.clone();
    }

    if let Some(snapshots) = &args.snapshots {
        config.storage.snapshots_path = snapshots.clone();
    }

    if let Some(tables) = &args.tables {
        config.storage.tables_path = Some(tables.clone());
    }

    Ok(config)
}

fn load_tables(config: &AppConfig) -> Result<TeamTables> {
    match &config.storage.tables_path {
        Some(path) => {
            info!("Loading team tables from: {}", path.display());
            TeamTables::from_file(path)
        }
        None => Ok(TeamTables::default()),
    }
}

/// Set the stop flag on Ctrl+C; the run ends at the next batch boundary
fn spawn_stop_listener(coordinator: &ResumeCoordinator) {
    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current batch");
            stop.store(true, Ordering::SeqCst);
        }
    });
}

fn display_startup_banner(config: &AppConfig, args: &Args) {
    let mode = if args.verify {
        "verify"
    } else if args.full {
        "full"
    } else {
        "incremental"
    };

    info!("Cricket Ratings v{}", cricket_ratings::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Mode: {}", mode);
    info!("   Matches: {}", config.storage.matches_path.display());
    info!("   Snapshots: {}", config.storage.snapshots_path.display());
    info!("   K factor: {}", config.engine.k_factor);
    info!("   Batch size: {}", config.engine.batch_size);
}

async fn run(args: &Args, config: AppConfig) -> Result<i32> {
    let tables = load_tables(&config)?;

    let _lock = if args.dry_run {
        None
    } else {
        Some(RunLock::acquire(
            &config.storage.snapshots_path,
            &config.service.name,
        )?)
    };

    let source = Arc::new(CsvMatchSource::new(&config.storage.matches_path));
    let repository =
        Arc::new(JsonFileSnapshotRepository::open(&config.storage.snapshots_path).await?);
    let coordinator = ResumeCoordinator::new(&config, &tables, source, repository)?;
    spawn_stop_listener(&coordinator);

    if args.verify {
        let report = coordinator.verify_snapshots().await?;
        println!("{}", report);
        return Ok(if report.is_consistent() { 0 } else { 2 });
    }

    let options = RunOptions {
        leaderboard: args.leaderboard,
        dry_run: args.dry_run,
    };
    let summary = if args.full {
        coordinator.full_recompute(&options).await?
    } else {
        coordinator.run_incremental(&options).await?
    };
    println!("{}", summary);

    if let Some(team) = &args.history {
        let history = coordinator.team_history(team).await?;
        println!();
        println!("Rating history of {}", coordinator.resolver().resolve(team));
        for point in history {
            println!(
                "  {}  #{:<8} {:>6}  vs {}",
                point.date, point.match_id, point.pre_match_rating, point.opponent
            );
        }
    }

    if args.leaderboard.is_some() && summary.leaderboard.is_empty() {
        let entries = coordinator.current_leaderboard(None).await?;
        print!("{}", render_leaderboard(&entries));
    }

    if args.metrics {
        println!();
        print!("{}", coordinator.metrics().gather_text()?);
    }

    Ok(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config, &args);

    match run(&args, config).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
