//! Jobdedup CLI - deduplicate scraped job postings from JSON files

use anyhow::Context;
use clap::{Parser, Subcommand};
use jobdedup::config::expand_path;
use jobdedup::{Config, DedupEngine, JobRecord};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "jobdedup")]
#[command(author = "Yolog Team")]
#[command(version)]
#[command(about = "Jobdedup - duplicate detection for scraped job postings", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.jobdedup/config.toml", env = "JOBDEDUP_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Group a JSON array of job records into duplicate clusters
    Dedupe {
        /// Input file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print only the representative records
        #[arg(long)]
        records: bool,
    },

    /// Compare two records given as a two-element JSON array
    Classify {
        /// Input file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Initialize a new config file with defaults
    Init,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("jobdedup={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = expand_path(&args.config);

    if let Command::Init = args.command {
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        Config::default()
    };
    config.apply_env_overrides();

    let engine = DedupEngine::new(config)?;

    match args.command {
        Command::Dedupe {
            input,
            output,
            records: records_only,
        } => {
            let records = read_records(&input)?;
            let report = engine.deduplicate(&records)?;
            tracing::info!(
                "{} records -> {} unique ({} duplicate groups, {} skipped)",
                report.total_records,
                report.unique_record_count,
                report.duplicate_groups,
                report.skipped.len()
            );
            let json = if records_only {
                serde_json::to_string_pretty(&engine.deduplicated(&records, &report))?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Classify { input } => {
            let records = read_records(&input)?;
            let [a, b] = <[JobRecord; 2]>::try_from(records).map_err(|r| {
                anyhow::anyhow!("classify expects exactly two records, got {}", r.len())
            })?;
            let result = engine.classify(&a, &b);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Init => {}
    }

    Ok(())
}

/// Read a JSON array of records from a file or stdin
fn read_records(path: &Path) -> anyhow::Result<Vec<JobRecord>> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    let records: Vec<JobRecord> =
        serde_json::from_str(&content).context("Input must be a JSON array of job records")?;
    Ok(records)
}
