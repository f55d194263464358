use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use benchtrack_core::{
    commit_descriptors, compare_table, display_name, engine_versions, summary_table,
    BenchtrackConfig, BenchmarkTable, Comparison, DisplayTable, PercentileSelection,
};
use benchtrack_storage::{load_bench_results, load_ci_results};

mod details;
mod render;

use details::{details_metrics, details_table, projected_label, select_percentiles};
use render::render;

#[derive(Parser, Debug)]
#[command(name = "benchtrack-report")]
#[command(about = "Summarises and compares inference-serving benchmark results", long_about = None)]
#[command(version)]
struct Cli {
    /// Live benchmark dataset (file:// or s3://), overrides configuration
    #[arg(long, global = true)]
    bench: Option<String>,

    /// Historical CI dataset (file:// or s3://), overrides configuration
    #[arg(long, global = true)]
    ci: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean metrics per model, rate and engine on one device
    Summary {
        /// Hardware to summarise (defaults to the first device in the dataset)
        #[arg(long)]
        device: Option<String>,
    },
    /// Relative deltas between two versions of the primary engine
    Compare {
        #[arg(long)]
        device: String,

        /// Version the deltas are relative to
        #[arg(long)]
        reference: String,

        #[arg(long)]
        candidate: String,

        /// Engine to compare (defaults to the configured primary engine)
        #[arg(long)]
        engine: Option<String>,
    },
    /// Versions of an engine recorded in the CI dataset
    Commits {
        #[arg(long)]
        engine: Option<String>,
    },
    /// First version seen for every engine
    Versions,
    /// Every trial of one model on one device
    Details {
        #[arg(long)]
        model: String,

        #[arg(long)]
        device: String,

        /// Percentile to show for a metric family (repeatable)
        #[arg(long = "percentile", value_name = "METRIC=TOKEN")]
        percentiles: Vec<String>,

        /// Also print each metric's min/max between two rates
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
        rate_window: Option<Vec<f64>>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args = Cli::parse();
    let config = BenchtrackConfig::load()?;
    let bench_uri = args.bench.unwrap_or(config.datasource.bench.clone());
    let ci_uri = args.ci.unwrap_or(config.datasource.ci.clone());
    let analytics = &config.analytics;

    match args.command {
        Command::Summary { device } => {
            let table = load_bench_results(&bench_uri).await?;
            let device = match device.or_else(|| table.devices().into_iter().next()) {
                Some(device) => device,
                None => return Err("benchmark dataset has no devices".into()),
            };
            info!(%device, "summarising");
            print_table(&summary_table(&table, &device, &analytics.summary_rates)?)?;
        }
        Command::Compare {
            device,
            reference,
            candidate,
            engine,
        } => {
            let table = load_ci_results(&ci_uri).await?;
            let engine = engine.unwrap_or_else(|| analytics.primary_engine.clone());
            let comparison = Comparison {
                device: &device,
                engine: &engine,
                reference: &reference,
                candidate: &candidate,
                rates: &analytics.comparison_rates,
            };
            print_table(&compare_table(&table, &comparison)?)?;
        }
        Command::Commits { engine } => {
            let table = load_ci_results(&ci_uri).await?;
            let engine = engine.unwrap_or_else(|| analytics.primary_engine.clone());
            let mut out = DisplayTable::new(["Label", "Version"]);
            for commit in commit_descriptors(&table, &engine) {
                out.push_row(vec![commit.label, commit.version_id]);
            }
            print_table(&out)?;
        }
        Command::Versions => {
            let table = load_bench_results(&bench_uri).await?;
            let mut out = DisplayTable::new([display_name("engine"), "Version"]);
            for (engine, version) in engine_versions(&table) {
                out.push_row(vec![engine, version]);
            }
            print_table(&out)?;
        }
        Command::Details {
            model,
            device,
            percentiles,
            rate_window,
        } => {
            let mut table = load_bench_results(&bench_uri).await?;
            let mut selection =
                PercentileSelection::new(analytics.percentile_families(), &analytics.default_percentile);
            select_percentiles(&mut selection, &mut table, &percentiles)?;

            let metrics = details_metrics(analytics.percentiles.keys().cloned());
            let metrics: Vec<&str> = metrics.iter().map(String::as_str).collect();
            print_table(&details_table(&table, &selection, &metrics, &model, &device))?;

            if let Some([min, max]) = rate_window.as_deref() {
                print_ranges(&table, &selection, &metrics, &model, &device, (*min, *max));
            }
        }
    }
    Ok(())
}

fn print_table(table: &DisplayTable) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(table)?);
    Ok(())
}

fn print_ranges(
    table: &BenchmarkTable,
    selection: &PercentileSelection,
    metrics: &[&str],
    model: &str,
    device: &str,
    window: (f64, f64),
) {
    println!("QPS {} to {}:", window.0, window.1);
    for metric in metrics {
        let label = projected_label(selection, metric);
        match table.metric_range(model, device, window, metric) {
            Some((lo, hi)) => println!("  {label}: {lo:.2} .. {hi:.2}"),
            None => println!("  {label}: no data"),
        }
    }
}

/// Initialize logging
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
