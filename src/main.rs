use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use planet::config::{Config, LogConfig, LogTarget};
use planet::export;
use planet::feed::{build_client, ingest_all, IngestOptions};
use planet::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(
    name = "planet",
    version,
    about = "Aggregate RSS and Atom feeds into a post store and export recent posts"
)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "planet.toml")]
    config: PathBuf,

    /// Database file (overrides `database` from the config)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Write the JSON export here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip fetching and export what is already stored
    #[arg(long)]
    no_fetch: bool,
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .with_context(|| format!("Invalid log filter {:?}", log.filter))?;

    match (log.target, &log.path) {
        (LogTarget::File, Some(path)) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;
    init_tracing(&config.log)?;
    for key in &config.unknown_keys {
        tracing::warn!(key = %key, "Unknown key in config file, ignoring");
    }
    tracing::info!(
        path = %args.config.display(),
        feeds = config.feeds.len(),
        "Loaded configuration"
    );

    let db_path = args.db.clone().unwrap_or_else(|| config.database.clone());
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!("Error: the post database is in use by another planet run. Try again later.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    if args.no_fetch {
        tracing::info!("Skipping fetch, exporting stored posts");
    } else if config.feeds.is_empty() {
        tracing::warn!(config = %args.config.display(), "No feeds configured");
    } else {
        let client = build_client().context("Failed to build HTTP client")?;
        let options = IngestOptions {
            concurrency: config.concurrency,
            retention: config
                .retention_days
                .map(|days| TimeDelta::days(i64::from(days))),
        };
        let report = ingest_all(&db, &client, &config.feeds, &options).await;
        if report.failed() > 0 {
            tracing::warn!(
                failed = report.failed(),
                total = report.outcomes.len(),
                "Some feeds could not be ingested"
            );
        }
    }

    let posts = db
        .query(
            TimeDelta::days(i64::from(config.days)),
            config.max_posts as usize,
        )
        .await
        .context("Failed to query posts")?;
    tracing::debug!(posts = posts.len(), days = config.days, "Exporting posts");

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            export::write_json(
                std::io::BufWriter::new(file),
                &posts,
                &config.feeds,
                &config.date_format,
            )
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            export::write_json(stdout.lock(), &posts, &config.feeds, &config.date_format)
                .context("Failed to write export")?;
        }
    }

    Ok(())
}
