//! Title Harvest CLI Application
//!
//! Fetches a list of URLs concurrently and prints the resulting URL → title
//! map once every fetch has finished or failed.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use title_harvest_lib::{
    build_tasks, load_env_config, parse_duration, read_url_file, validate_url, ConfigManager,
    EnvConfig, FileConfig, HarvestConfig, HarvestReport, Harvester, Strategy, DEFAULT_URLS,
    MAX_CONCURRENCY,
};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for title-harvest
#[derive(Parser, Debug)]
#[command(name = "title-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Fetch pages concurrently and collect their <title> elements")]
#[command(
    long_about = "Fetch pages concurrently and collect their <title> elements.\n\nEvery URL gets its own worker. Results are combined either in a mutex-guarded map (--strategy locked) or through a bounded channel drained by one collector (--strategy channel). Failed fetches are skipped silently."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// URLs to fetch (defaults to a small built-in list)
    #[arg(value_name = "URLS", help_heading = "Input")]
    pub urls: Vec<String>,

    /// Input file with URLs (one per line, # comments)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Repeat the URL list N times (duplicates collapse to one entry)
    #[arg(short = 'r', long = "repeat", value_name = "N", help_heading = "Input")]
    pub repeat: Option<usize>,

    /// Aggregation strategy: locked or channel
    #[arg(short = 's', long = "strategy", value_name = "STRATEGY", help_heading = "Execution")]
    pub strategy: Option<String>,

    /// Max concurrent fetches (default: unbounded)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Execution")]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. 5s, 2m (default: none)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Execution")]
    pub timeout: Option<String>,

    /// Do not record pages that have no <title>
    #[arg(long = "skip-untitled", help_heading = "Execution")]
    pub skip_untitled: bool,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Colored, aligned output with a summary line
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging for every task
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Settings resolved from defaults, config files, environment and CLI.
#[derive(Debug)]
struct RunSettings {
    harvest: HarvestConfig,
    repeat: usize,
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over -v/-d.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.json && args.pretty {
        return Err("Cannot use --json together with --pretty".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if let Some(strategy) = &args.strategy {
        strategy.parse::<Strategy>().map_err(|e| e.to_string())?;
    }

    if let Some(timeout) = &args.timeout {
        if parse_duration(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    for url in &args.urls {
        validate_url(url).map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Main harvesting logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let settings = build_settings(&args, &env_config)?;
    let urls = get_urls(&args, &env_config)?;
    let tasks = build_tasks(&urls, settings.repeat);

    tracing::info!(
        urls = urls.len(),
        tasks = tasks.len(),
        strategy = %settings.harvest.strategy,
        "starting harvest"
    );

    let harvester = Harvester::with_config(settings.harvest.clone())?;

    if args.pretty {
        ui::print_header(tasks.len(), harvester.config());
        let spinner = ui::Spinner::start(format!("Fetching {} URLs...", tasks.len()));
        let report = harvester.harvest(tasks).await;
        spinner.stop().await;
        ui::print_results(&report.results);
        ui::print_summary(&report.results, &report.stats);
        return Ok(());
    }

    let report = harvester.harvest(tasks).await;
    display_results(&report, settings.json)
}

/// Resolve settings. Precedence: CLI > env > config file > built-in defaults.
fn build_settings(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<RunSettings, Box<dyn std::error::Error>> {
    let file_config = load_file_config(args, env_config)?;

    let mut settings = RunSettings {
        harvest: HarvestConfig::default(),
        repeat: 1,
        json: false,
    };

    // Step 1: config files
    if let Some(defaults) = file_config.defaults {
        settings.harvest = defaults.apply(settings.harvest)?;
        if let Some(repeat) = defaults.repeat {
            settings.repeat = repeat;
        }
        if let Some(json) = defaults.json {
            settings.json = json;
        }
    }

    // Step 2: environment variables (TH_*)
    if let Some(strategy) = env_config.strategy {
        settings.harvest.strategy = strategy;
    }
    if let Some(concurrency) = env_config.concurrency {
        settings.harvest.concurrency = Some(concurrency);
    }
    if let Some(timeout) = env_config.timeout {
        settings.harvest.timeout = Some(timeout);
    }
    if let Some(repeat) = env_config.repeat {
        settings.repeat = repeat;
    }
    if let Some(json) = env_config.json {
        settings.json = json;
    }

    // Step 3: CLI arguments (already validated)
    if let Some(strategy) = &args.strategy {
        settings.harvest.strategy = strategy.parse()?;
    }
    if let Some(concurrency) = args.concurrency {
        settings.harvest.concurrency = Some(concurrency);
    }
    if let Some(timeout) = &args.timeout {
        if let Some(duration) = parse_duration(timeout) {
            settings.harvest.timeout = Some(duration);
        }
    }
    if args.skip_untitled {
        settings.harvest.record_untitled = false;
    }
    if let Some(repeat) = args.repeat {
        settings.repeat = repeat;
    }
    if args.json {
        settings.json = true;
    }

    tracing::debug!(?settings, "resolved settings");
    Ok(settings)
}

/// Explicit --config, then TH_CONFIG, then discovery.
fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    let explicit = args.config.as_ref().or(env_config.config.as_ref());
    if let Some(path) = explicit {
        tracing::info!(path = %path, "using explicit config file");
        let file_config = config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        return Ok(file_config);
    }

    Ok(config_manager.discover_and_load()?)
}

/// URLs from the command line and/or a file; the built-in list otherwise.
fn get_urls(args: &Args, env_config: &EnvConfig) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut urls: Vec<String> = args.urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(path) = args.file.as_ref().or(env_config.file.as_ref()) {
        urls.extend(read_url_file(path)?);
    }

    if urls.is_empty() {
        tracing::info!("no URLs given, using built-in list");
        urls = DEFAULT_URLS.iter().map(|u| u.to_string()).collect();
    }

    Ok(urls)
}

fn display_results(
    report: &HarvestReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        println!("{}", report.results);
    }
    Ok(())
}
