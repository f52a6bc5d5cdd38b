//! testudo main entry point
//!
//! This is the command-line interface for the Schedule of Classes scraper.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use testudo_scrape::config::{load_or_default, validate, validate_department_code, validate_term, Config};
use testudo_scrape::crawler::{ScrapeMode, Scraper};
use testudo_scrape::output::{load_statistics, print_corpus_statistics, print_statistics};
use testudo_scrape::storage::JsonStorage;
use testudo_scrape::syllabus::SyllabusSource;
use tracing_subscriber::EnvFilter;

/// testudo: a polite Schedule of Classes scraper
///
/// Scrapes courses and sections from the University of Maryland Schedule of
/// Classes and writes one JSON file per course under
/// `{data-dir}/{term}/{prefix}/{course}.json`.
#[derive(Parser, Debug)]
#[command(name = "testudo")]
#[command(version = "1.0.0")]
#[command(about = "A polite course catalog scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a small test scrape, optionally of the given department
    #[arg(long, value_name = "DEPT", conflicts_with = "department")]
    test: Option<Option<String>>,

    /// Scrape a single department
    #[arg(long, value_name = "DEPT")]
    department: Option<String>,

    /// Scrape a specific term, e.g. 202508
    #[arg(long, value_name = "TERM")]
    term: Option<String>,

    /// Extract the most recent syllabus of each course (needs a browser)
    #[arg(long)]
    extract_syllabi: bool,

    /// Directory to write course files to
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Delay between course requests in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the corpus on disk and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Folds command-line overrides into the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.scraper.data_dir = dir.clone();
        }
        if let Some(delay) = self.delay {
            config.scraper.request_delay = delay;
        }
        if self.extract_syllabi {
            config.scraper.extract_syllabi = true;
        }
    }

    fn mode(&self) -> ScrapeMode {
        match (&self.test, &self.department) {
            (Some(department), _) => ScrapeMode::Test {
                department: department.clone(),
            },
            (None, Some(department)) => ScrapeMode::Department(department.clone()),
            (None, None) => ScrapeMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to build default configuration".to_string(),
    })?;
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    setup_logging(cli.verbose, cli.quiet, &config.log_level);

    if let Some(term) = &cli.term {
        validate_term(term).context("Invalid --term")?;
    }
    let mode = cli.mode();
    match &mode {
        ScrapeMode::Test {
            department: Some(department),
        }
        | ScrapeMode::Department(department) => {
            validate_department_code(department).context("Invalid department")?;
        }
        _ => {}
    }

    if cli.dry_run {
        handle_dry_run(&config, &mode, cli.term.as_deref());
        return Ok(ExitCode::SUCCESS);
    }
    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_scrape(config, mode, cli.term).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins when set; otherwise `-v`/`-q` pick the level, falling back
/// to the configured `log-level`.
fn setup_logging(verbose: u8, quiet: bool, default_level: &str) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!("testudo_scrape={},testudo={},warn", default_level, default_level)),
            1 => EnvFilter::new("testudo_scrape=debug,testudo=debug,info"),
            2 => EnvFilter::new("testudo_scrape=trace,testudo=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, mode: &ScrapeMode, term: Option<&str>) {
    println!("=== testudo Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  User agent: {}", config.site.user_agent);
    println!("  Default term: {}", config.site.default_term);
    println!("  Request timeout: {}s", config.site.request_timeout_secs);

    println!("\nScraper:");
    println!("  Request delay: {}s", config.scraper.request_delay);
    println!("  Data directory: {}", config.scraper.data_dir.display());
    println!("  Extract syllabi: {}", config.scraper.extract_syllabi);

    println!("\nRetry:");
    println!(
        "  Discovery: {} attempts, {}s base delay",
        config.retry.discovery.max_retries, config.retry.discovery.base_delay
    );
    println!(
        "  Sections: {} attempts, {}s base delay",
        config.retry.sections.max_retries, config.retry.sections.base_delay
    );

    println!("\nRun:");
    match mode {
        ScrapeMode::Test { department } => println!(
            "  Test mode: {} (first {} courses, nothing written)",
            department
                .as_deref()
                .unwrap_or(&config.scraper.test_department),
            config.scraper.test_max_courses
        ),
        ScrapeMode::Department(department) => println!("  Department: {}", department),
        ScrapeMode::Full => println!("  Full scrape of every department"),
    }
    match term {
        Some(term) => println!("  Term: {}", term),
        None if *mode == ScrapeMode::Full => println!("  Terms: all listed"),
        None => println!("  Term: {}", config.site.default_term),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes the corpus on disk
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Data directory: {}\n", config.scraper.data_dir.display());

    let storage = JsonStorage::new(config.scraper.data_dir.clone());
    let stats = load_statistics(&storage).context("Failed to read corpus")?;
    print_corpus_statistics(&stats);

    Ok(())
}

/// Handles the main scrape, choosing the syllabus source
async fn handle_scrape(config: Config, mode: ScrapeMode, term: Option<String>) -> anyhow::Result<ExitCode> {
    #[cfg(feature = "browser")]
    {
        if config.scraper.extract_syllabi {
            let source = testudo_scrape::syllabus::BrowserSyllabi::new(config.syllabus.clone());
            return execute(config, source, mode, term).await;
        }
    }

    #[cfg(not(feature = "browser"))]
    let config = {
        let mut config = config;
        if config.scraper.extract_syllabi {
            tracing::warn!(
                "Syllabus extraction requested but this build has no browser support; continuing without it"
            );
            config.scraper.extract_syllabi = false;
        }
        config
    };

    execute(config, testudo_scrape::syllabus::NoSyllabi, mode, term).await
}

/// Runs the scrape until it finishes or Ctrl-C arrives
///
/// Statistics are printed when the scraper is dropped, so they appear after
/// success, failure, interruption, or a panic.
async fn execute<S: SyllabusSource>(
    config: Config,
    source: S,
    mode: ScrapeMode,
    term: Option<String>,
) -> anyhow::Result<ExitCode> {
    let mut scraper = Scraper::new(config, source)
        .context("Failed to initialize scraper")?
        .report_on_drop(print_statistics);

    let outcome = tokio::select! {
        result = scraper.run(&mode, term.as_deref()) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let code = match outcome {
        Some(Ok(())) => {
            tracing::info!("Scrape completed successfully");
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            tracing::error!("Scrape failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        None => {
            tracing::warn!("Scraping interrupted by user");
            eprintln!("Scraping interrupted by user");
            ExitCode::FAILURE
        }
    };

    drop(scraper);
    Ok(code)
}
