use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use benchtrack_core::{BenchtrackConfig, Meta};
use benchtrack_storage::{publish_records, AutoMetricsStore};

mod results;

use results::{bench_id, parse_results, BENCH_ID_KEY};

#[derive(Parser, Debug)]
#[command(name = "benchtrack-publish")]
#[command(about = "Pushes benchmark results to an OpenSearch metrics store", long_about = None)]
#[command(version)]
struct Cli {
    /// Metrics store URI (es://user:pass@host:port or es+aws://host)
    #[arg(long, env = "BENCHTRACK_STORE_URI")]
    uri: Option<String>,

    /// Collection receiving the records
    #[arg(long, env = "BENCHTRACK_STORE_COLLECTION")]
    collection: Option<String>,

    /// Extra key=value metadata stored with every record (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,

    /// Benchmark results file (JSON)
    results: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args = Cli::parse();
    let config = BenchtrackConfig::load()?;

    let mut store_config = config.store.clone();
    if let Some(uri) = args.uri {
        store_config.uri = uri;
    }
    let collection = args.collection.unwrap_or(config.store.collection);

    let raw = tokio::fs::read(&args.results).await?;
    let mut meta = Meta::from_pairs(&args.meta)?;
    meta.insert(BENCH_ID_KEY, bench_id(&raw))?;

    let records = parse_results(&raw)?.to_records(&meta)?;
    info!(
        file = %args.results.display(),
        records = records.len(),
        %collection,
        "publishing benchmark results"
    );

    let store = AutoMetricsStore::from_config(&store_config).await?;
    let report = publish_records(store.as_ref(), &collection, &records).await;

    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!("❌ record #{} ({}): {}", failure.index, failure.metric, e);
        }
    }
    if !report.is_complete() {
        return Err(format!(
            "{} of {} records failed to publish",
            records.len() - report.succeeded(),
            records.len()
        )
        .into());
    }

    println!("✅ Published {} records to {}", report.succeeded(), collection);
    Ok(())
}

/// Initialize logging
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
