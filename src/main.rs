//! Thread-Harvest main entry point
//!
//! This is the command-line interface for the Thread-Harvest forum crawler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thread_harvest::config::{load_config_with_hash, Config};
use thread_harvest::crawler::{Scheduler, Supervisor};
use thread_harvest::forum::{ForumApi, RedditClient};
use thread_harvest::output::{load_statistics, print_cycle_report, print_statistics};
use thread_harvest::storage::{open_repository, ItemRepository};
use thread_harvest::{web, HarvestError};
use tracing_subscriber::EnvFilter;

/// Thread-Harvest: an incremental forum crawler
///
/// Thread-Harvest polls a fixed set of forums, stores every new post and
/// its full comment tree exactly once, and serves the stored items over a
/// small read-only HTTP API.
#[derive(Parser, Debug)]
#[command(name = "thread-harvest")]
#[command(version)]
#[command(about = "An incremental forum crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Crawl forever, restarting after fatal errors (default)
    Crawl,
    /// Run exactly one cycle and exit
    Once,
    /// Serve the read API
    Serve,
    /// Validate config and show what would be crawled without crawling
    DryRun,
    /// Show statistics from the database and exit
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Command::Crawl) {
        Command::Crawl => handle_crawl(config).await,
        Command::Once => handle_once(&config).await,
        Command::Serve => handle_serve(&config).await,
        Command::DryRun => handle_dry_run(&config),
        Command::Stats => handle_stats(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("thread_harvest=info,warn"),
            1 => EnvFilter::new("thread_harvest=debug,info"),
            2 => EnvFilter::new("thread_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> Result<Arc<dyn ItemRepository>> {
    let repo = open_repository(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))?;
    Ok(Arc::new(repo))
}

fn build_scheduler(config: &Config) -> Result<Scheduler, HarvestError> {
    let api: Arc<dyn ForumApi> = Arc::new(RedditClient::new(&config.forum_api)?);
    let repo = open_repository(Path::new(&config.storage.database_path))?;
    Ok(Scheduler::from_config(config, api, Arc::new(repo)))
}

/// Handles the default mode: supervised crawling until Ctrl-C
async fn handle_crawl(config: Config) -> Result<()> {
    tracing::info!(
        "Crawling {} forums every {}s",
        config.forums.len(),
        config.crawler.interval_secs
    );

    let supervisor = Supervisor::new(Duration::from_secs(config.crawler.restart_delay_secs));
    tokio::select! {
        result = supervisor.run(|| build_scheduler(&config)) => {
            result.context("Crawler stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }
    Ok(())
}

/// Handles `once`: one cycle, then exit; fails if any forum hit a fatal error
async fn handle_once(config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(config)?;
    let report = scheduler.run_cycle().await?;
    report.log_summary();
    print_cycle_report(&report);

    let fatal = report.fatal_forums();
    if !fatal.is_empty() {
        return Err(HarvestError::FatalCycle { forums: fatal }.into());
    }
    Ok(())
}

/// Handles `serve`: runs the read API
async fn handle_serve(config: &Config) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("Invalid bind address")?;
    let repo = open_store(config)?;
    web::serve(addr, repo).await.context("Read API failed")?;
    Ok(())
}

/// Handles `dry-run`: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Thread-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Interval: {}s", config.crawler.interval_secs);
    println!(
        "  Max expansion rounds: {}",
        config.crawler.max_expansion_rounds
    );
    println!(
        "  Max concurrent forums: {}",
        config.crawler.max_concurrent_forums
    );
    println!(
        "  Max concurrent posts: {}",
        config.crawler.max_concurrent_posts
    );
    println!("  Restart delay: {}s", config.crawler.restart_delay_secs);

    println!("\nForum API:");
    println!("  API URL: {}", config.forum_api.api_url);
    println!("  Auth URL: {}", config.forum_api.auth_url);
    println!("  User agent: {}", config.forum_api.user_agent);
    println!("  Username: {}", config.forum_api.username);
    println!("  Timeout: {}s", config.forum_api.timeout_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nRead API:");
    println!("  Bind: {}", config.server.bind);

    println!("\nForums ({}):", config.forums.len());
    for forum in &config.forums {
        println!("  - {}", forum);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would sync {} forums, first cycle starting immediately",
        config.forums.len()
    );

    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let repo = open_store(config)?;
    let stats = load_statistics(repo.as_ref())?;
    print_statistics(&stats);

    Ok(())
}
