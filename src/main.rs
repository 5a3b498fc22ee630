//! Geo-Harvest main entry point
//!
//! This is the command-line interface for the Geo-Harvest country harvester.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use geo_harvest::config::{load_config_with_hash, validate, Config};
use geo_harvest::output::{print_statistics, write_mysql_export, ExportHeader};
use geo_harvest::{Coordinator, Country};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Hash reported when no configuration file is given
const BUILTIN_CONFIG_HASH: &str = "builtin-defaults";

/// Geo-Harvest: a polite country and region harvester
///
/// Geo-Harvest walks a country listing, each country's detail page and its
/// region list, then prints the result or exports it as MySQL scripts.
#[derive(Parser, Debug)]
#[command(name = "geo-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite country and region harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl and print results
    List {
        #[command(subcommand)]
        what: ListTarget,
    },

    /// Crawl and generate export scripts
    Generate {
        #[command(subcommand)]
        format: GenerateFormat,
    },

    /// Validate and print the effective configuration
    CheckConfig,
}

#[derive(Subcommand, Debug)]
enum ListTarget {
    /// Print every harvested country with its regions
    Countries,
}

#[derive(Subcommand, Debug)]
enum GenerateFormat {
    /// Write countries.sql and regions.sql
    Mysql {
        /// Output directory (overrides [output] directory)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load(cli.config.as_ref())?;

    match cli.command {
        Command::CheckConfig => handle_check_config(&config, &config_hash),
        Command::List {
            what: ListTarget::Countries,
        } => handle_list_countries(&config).await,
        Command::Generate {
            format: GenerateFormat::Mysql { out_dir },
        } => handle_generate_mysql(&config, &config_hash, out_dir).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("geo_harvest=info,warn"),
            1 => EnvFilter::new("geo_harvest=debug,info"),
            2 => EnvFilter::new("geo_harvest=trace,debug"),
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

/// Loads the configuration file, or falls back to the built-in defaults
fn load(path: Option<&PathBuf>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, hash))
        }
        None => {
            let config = Config::default();
            validate(&config).context("Built-in configuration is invalid")?;
            Ok((config, BUILTIN_CONFIG_HASH.to_string()))
        }
    }
}

/// Runs the three-tier harvest and prints its statistics
async fn crawl(config: &Config) -> anyhow::Result<Vec<Country>> {
    let root = Url::parse(&config.site.root_url)
        .with_context(|| format!("Invalid root URL {}", config.site.root_url))?;

    tracing::info!(
        "Harvest starting at {} (parallelism list {}, detail {}, region {})",
        root,
        config.tiers.list.parallelism,
        config.tiers.detail.parallelism,
        config.tiers.region.parallelism
    );

    let coordinator = Coordinator::new(config)?;
    let (countries, stats) = coordinator.run_with_stats(&root).await;

    if stats.total_failures() > 0 {
        tracing::warn!(
            failures = stats.total_failures(),
            "Some pages could not be fetched; the result is partial"
        );
    }
    print_statistics(&stats, &countries);

    Ok(countries)
}

/// Handles `list countries`: prints the collection in discovery order
async fn handle_list_countries(config: &Config) -> anyhow::Result<()> {
    let countries = crawl(config).await?;
    println!();
    println!("{:#?}", countries);
    Ok(())
}

/// Handles `generate mysql`: writes both export scripts
async fn handle_generate_mysql(
    config: &Config,
    config_hash: &str,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let directory = out_dir.unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let countries = crawl(config).await?;

    let report = write_mysql_export(&countries, &directory, &ExportHeader::now(config_hash));

    for path in &report.written {
        println!("✓ Wrote {}", path.display());
    }
    if !report.is_complete() {
        for err in &report.failed {
            eprintln!("✗ {}", err);
        }
        bail!("{} export file(s) failed", report.failed.len());
    }

    Ok(())
}

/// Handles `check-config`: prints the effective configuration
fn handle_check_config(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== Geo-Harvest Configuration ===\n");

    println!("Site:");
    println!("  Root URL: {}", config.site.root_url);
    println!("  Allowed host: {}", config.site.allowed_host);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);

    println!("\nTiers:");
    for (name, tier) in [
        ("list", &config.tiers.list),
        ("detail", &config.tiers.detail),
        ("region", &config.tiers.region),
    ] {
        println!(
            "  {:<7} parallelism {:>3}, delay {:>5}ms, jitter {:>5}ms",
            name, tier.parallelism, tier.delay_ms, tier.jitter_ms
        );
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\nHash: {}", config_hash);
    println!("\n✓ Configuration is valid");

    Ok(())
}
