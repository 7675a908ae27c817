//! alblogs - load a sample of AWS Application Load Balancer access logs into
//! SQLite for ad-hoc analysis.

mod config;
mod handoff;

use std::path::PathBuf;

use alblogs_connectors::s3::build_store;
use alblogs_connectors::{CandidateKeySelector, ElbClient, MetadataCache, MetadataResolver, S3Config};
use alblogs_core::{default_fields, open_store, parse_reference_time, IngestionEngine, SchemaBuilder};
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use chrono::{DateTime, Local, Utc};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::Paths;

const FIELDS_DOC_URL: &str = "https://docs.aws.amazon.com/elasticloadbalancing/latest/application/load-balancer-access-logs.html#access-log-entry-syntax";

#[derive(Parser, Debug)]
#[command(name = "alblogs")]
#[command(about = "Fetch a sample of AWS Elastic Load Balancer logs and load it into an SQLite database")]
#[command(version)]
struct Cli {
    /// Load at most this number of candidate log files
    #[arg(short = 'n', value_name = "NUMBER", default_value_t = 1, env = "ALBLOGS_MAX_FILES",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_files: u32,

    /// Path to the database file; if empty, use a file in a temporary
    /// directory. The same database file may be reused between runs.
    #[arg(long, value_name = "PATH", env = "ALBLOGS_DB")]
    db: Option<PathBuf>,

    /// Take the log sample around this time, either hh:mm for today or
    /// yyyy-mm-ddThh:mm; if empty, use a few minutes in the past
    #[arg(long, value_name = "TIME", default_value = "", env = "ALBLOGS_TIME")]
    time: String,

    /// Treat time as UTC instead of the local time zone
    #[arg(long, env = "ALBLOGS_UTC")]
    utc: bool,

    /// Clean cache and temporary files and exit
    #[arg(long)]
    clean: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Name of the load balancer
    load_balancer: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let paths = Paths::from_env();
    if cli.clean {
        paths.clean();
        return Ok(());
    }

    let load_balancer = match require_load_balancer(&cli) {
        Ok(name) => name,
        Err(e) => e.exit(),
    };

    let ref_time: DateTime<Utc> = if cli.utc {
        parse_reference_time(&cli.time, &Utc::now())?
    } else {
        parse_reference_time(&cli.time, &Local::now())?
    };
    info!("Reference time {}", ref_time.to_rfc3339());

    let database = tokio::select! {
        res = run(&cli, &paths, load_balancer, ref_time) => res?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
    };

    info!("For details on field description see");
    info!("{}", FIELDS_DOC_URL);
    info!("Database file: {}", database.display());
    handoff::open_shell(&database)
}

/// The name is optional on the command line only so `--clean` can run alone.
fn require_load_balancer(cli: &Cli) -> Result<&str, clap::Error> {
    cli.load_balancer.as_deref().ok_or_else(|| {
        Cli::command().error(
            ErrorKind::MissingRequiredArgument,
            "a load balancer name is required",
        )
    })
}

/// Resolve, list and ingest; returns the closed database path.
async fn run(cli: &Cli, paths: &Paths, load_balancer: &str, ref_time: DateTime<Utc>) -> Result<PathBuf> {
    let sdk = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let cache = MetadataCache::load(paths.cache_file());
    let mut resolver = MetadataResolver::new(ElbClient::new(&sdk), cache);
    let meta = resolver.resolve(load_balancer).await?;

    let store = build_store(&S3Config::for_logs(&meta), &sdk)?;
    info!("Fetching candidate log files list, this may take a while");
    let candidates = CandidateKeySelector::new(store.clone(), meta.bucket.clone())
        .select(&meta, &ref_time)
        .await?
        .require_any()?;
    info!("Found {} candidate log files", candidates.keys.len());

    let database = match &cli.db {
        Some(path) => path.clone(),
        None => paths
            .default_database(load_balancer)
            .context("creating temporary directory")?,
    };

    let fields = default_fields().context("bundled field list")?;
    let pool = open_store(&database)
        .await
        .with_context(|| format!("opening {}", database.display()))?;
    let engine = IngestionEngine::new(store, pool, SchemaBuilder::build(&fields)).await?;

    let keys = candidates.keys.iter().map(|c| c.key.as_str());
    let rows = engine.ingest_all(keys, cli.max_files as usize).await?;
    info!("Loaded {} records from s3://{}", rows, candidates.bucket);
    engine.close().await;

    Ok(database)
}
