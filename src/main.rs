//! Lodestone main entry point
//!
//! This is the command-line interface for the Lodestone magnet-link crawler.

use anyhow::Context;
use clap::Parser;
use lodestone::config::{load_config_with_hash, load_seed_sites, write_example_seed_file, Config};
use lodestone::output::{
    generate_markdown_summary, print_run_history, print_summary, FileSink, ResultSink,
};
use lodestone::storage::{open_run_store, FileFingerprintLog, FingerprintLog, RunStore};
use lodestone::{Crawler, Deduplicator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lodestone: a focused magnet-link crawler
///
/// Lodestone visits every site in the seed list, follows links on the same
/// host while respecting robots.txt, and collects the magnet links it finds.
/// Links already recorded in the history files are never reported twice.
#[derive(Parser, Debug)]
#[command(name = "lodestone")]
#[command(version)]
#[command(about = "A focused magnet-link crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when it does not exist)
    #[arg(value_name = "CONFIG", default_value = "lodestone.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed file to read instead of the configured one
    #[arg(long, value_name = "PATH")]
    seeds: Option<PathBuf>,

    /// Workers per site, overriding the configuration
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    workers: Option<u32>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show recent runs from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

const RECENT_RUNS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if let Some(seeds) = &cli.seeds {
        config.output.seeds_path = seeds.display().to_string();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    if cli.stats {
        handle_stats(&config)
    } else if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lodestone=info,warn"),
            1 => EnvFilter::new("lodestone=debug,info"),
            2 => EnvFilter::new("lodestone=trace,debug"),
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

/// Reads the seed list, writing an example file when it is missing
///
/// Returns `None` when the example was just created and there is nothing to crawl yet.
fn seed_sites(config: &Config) -> anyhow::Result<Option<Vec<url::Url>>> {
    let path = Path::new(&config.output.seeds_path);

    if write_example_seed_file(path)
        .with_context(|| format!("Failed to create {}", path.display()))?
    {
        println!(
            "Seed file {} was missing; an example was created. Add your sites and run again.",
            path.display()
        );
        return Ok(None);
    }

    let sites = load_seed_sites(path)?;
    Ok(Some(sites))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Lodestone Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers per site: {}", config.crawler.workers);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Site delay: {}ms", config.crawler.site_delay_ms);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);

    println!("\nScope:");
    println!("  Max URL length: {}", config.scope.max_url_length);
    println!("  Max query length: {}", config.scope.max_query_length);
    println!("  Denied extensions: {}", config.scope.denied_extensions.len());

    println!("\nUser agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  History: {}", config.output.history_path);
    for extra in &config.output.extra_history {
        println!("  Extra history: {}", extra);
    }
    println!("  New links: {}", config.output.new_links_path);
    println!("  Reports: {}", config.output.reports_dir);
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nSkip keywords: {:?}", config.filter.skip_keywords);
    println!("\nCategories ({}):", config.categories.len());
    for rule in &config.categories {
        println!("  - {}: {}", rule.name, rule.keywords.join(", "));
    }

    let Some(sites) = seed_sites(config)? else {
        return Ok(());
    };

    println!("\nSites ({}):", sites.len());
    for site in &sites {
        println!("  * {}", site);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} sites", sites.len());

    Ok(())
}

/// Handles the --stats mode: shows recent runs from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.database_path);
    println!("Database: {}\n", path.display());

    let store = open_run_store(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    let mut runs = Vec::new();
    for run in store.recent_runs(RECENT_RUNS)? {
        let sessions = store.sessions_for_run(run.id)?;
        runs.push((run, sessions));
    }

    print_run_history(&runs);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let Some(sites) = seed_sites(&config)? else {
        return Ok(());
    };
    if sites.is_empty() {
        println!("No sites to crawl in {}", config.output.seeds_path);
        return Ok(());
    }

    let extra: Vec<PathBuf> = config.output.extra_history.iter().map(PathBuf::from).collect();
    let history = FileFingerprintLog::open(Path::new(&config.output.history_path), &extra)
        .context("Failed to open the history log")?;
    let history: Arc<dyn FingerprintLog> = Arc::new(history);

    let dedup = Deduplicator::from_history(history.as_ref())
        .context("Failed to load known fingerprints")?;
    tracing::info!("{} fingerprints already known", dedup.len());

    let sink: Arc<dyn ResultSink> = Arc::new(
        FileSink::create(
            Path::new(&config.output.new_links_path),
            Arc::clone(&history),
            Path::new(&config.output.reports_dir),
        )
        .context("Failed to open the output files")?,
    );

    let store = open_run_store(Path::new(&config.output.database_path))
        .context("Failed to open the run database")?;

    let summary_path = PathBuf::from(&config.output.summary_path);
    let mut crawler = Crawler::new(config, Arc::new(dedup), sink)?
        .with_config_hash(config_hash)
        .with_run_store(Box::new(store) as Box<dyn RunStore + Send>);

    let stop = crawler.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let summary = crawler.run(&sites).await.context("Crawl failed")?;

    print_summary(&summary);
    generate_markdown_summary(&summary, &summary_path)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;
    tracing::info!("Summary written to {}", summary_path.display());

    Ok(())
}
