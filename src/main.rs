//! Depth-Ripple main entry point
//!
//! This is the command-line interface for the Depth-Ripple crawler.

use chrono::Utc;
use clap::Parser;
use depth_ripple::config::{load_config_with_hash, validate, BackendKind, Config};
use depth_ripple::crawler::run_crawl;
use depth_ripple::output::{
    print_comparison, print_summary, write_markdown_summary, CrawlSummary,
};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Depth-Ripple: a depth-bounded recursive crawler
///
/// Depth-Ripple walks outward from each seed URL one level at a time,
/// fetching at most a fixed number of pages per level, following the links
/// it finds, and reports what it reached at every depth.
#[derive(Parser, Debug)]
#[command(name = "depth-ripple")]
#[command(version)]
#[command(about = "A depth-bounded recursive crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl instead of the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Print summaries as JSON instead of the console report
    #[arg(long, conflicts_with = "dry_run")]
    json: bool,

    /// Crawl each seed once per listed backend and compare them (e.g. http,firecrawl,render)
    #[arg(long, value_name = "BACKENDS", value_delimiter = ',', conflicts_with = "dry_run")]
    compare: Vec<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if !cli.seeds.is_empty() {
        config.crawler.seeds = cli.seeds;
        validate(&config)?;
    }
    if config.crawler.seeds.is_empty() {
        return Err("no seed URLs: set crawler.seeds or pass --seed".into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(&config, &cli.compare, cli.json).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("depth_ripple=info,warn"),
            1 => EnvFilter::new("depth_ripple=debug,info"),
            2 => EnvFilter::new("depth_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Depth-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max pages per level: {}",
        config.crawler.max_pages_per_level
    );
    println!(
        "  Inter-request delay: {}s",
        config.crawler.inter_request_delay
    );
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    match config.crawler.max_total_pages {
        Some(pages) => println!("  Total page budget: {}", pages),
        None => println!("  Total page budget: none"),
    }
    match config.crawler.stall_timeout {
        Some(secs) => println!("  Stall timeout: {}s", secs),
        None => println!("  Stall timeout: none"),
    }

    println!("\nLinks:");
    println!("  Max per page: {}", config.links.max_per_page);
    println!("  Path rule: {:?}", config.links.path_rule);
    if config.links.patterns.is_empty() {
        println!("  Patterns: dated-article preset for each seed host");
    } else {
        for pattern in &config.links.patterns {
            println!("  Pattern: {}", pattern);
        }
    }

    println!("\nBackend:");
    println!("  Kind: {}", config.backend.kind);
    println!("  Timeout: {}s", config.backend.timeout);
    if let Some(selector) = &config.backend.wait_for {
        println!("  Render wait-for: {}", selector);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    match &config.output.summary_path {
        Some(path) => println!("  Summary: {}", path),
        None => println!("  Summary: console only"),
    }

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} seed URLs to depth {}",
        config.crawler.seeds.len(),
        config.crawler.max_depth
    );
}

/// Handles the main crawl operation, one independent crawl per seed
///
/// With `compare` set, each seed is crawled once per listed backend instead
/// of once with the configured backend.
async fn handle_crawl(
    config: &Config,
    compare: &[BackendKind],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            interrupt.cancel();
        }
    });

    let backends = if compare.is_empty() {
        vec![config.backend.kind]
    } else {
        compare.to_vec()
    };

    let started_at = Utc::now();
    tracing::info!(
        "Crawling {} seed URLs with {} backend(s) (started {})",
        config.crawler.seeds.len(),
        backends.len(),
        started_at.to_rfc3339()
    );

    let mut summaries: Vec<CrawlSummary> = Vec::new();
    for seed in &config.crawler.seeds {
        let mut seed_summaries: Vec<CrawlSummary> = Vec::new();

        for kind in &backends {
            if cancel.is_cancelled() {
                tracing::info!("Skipping {} ({}) after interrupt", seed, kind);
                continue;
            }

            let mut run_config = config.clone();
            run_config.backend.kind = *kind;

            match run_crawl(&run_config, seed, cancel.clone()).await {
                Ok(summary) => {
                    if !json {
                        print_summary(&summary);
                    }
                    seed_summaries.push(summary);
                }
                Err(e) => {
                    tracing::error!("Crawl from {} with {} failed: {}", seed, kind, e);
                    return Err(e.into());
                }
            }
        }

        if !compare.is_empty() && !json && !seed_summaries.is_empty() {
            print_comparison(seed, &seed_summaries);
        }
        summaries.append(&mut seed_summaries);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if let Some(path) = &config.output.summary_path {
        write_markdown_summary(&summaries, Path::new(path), Utc::now())?;
        tracing::info!("Summary written to: {}", path);
    }

    tracing::info!(
        "Finished {} crawls in {}s",
        summaries.len(),
        (Utc::now() - started_at).num_seconds()
    );

    Ok(())
}
