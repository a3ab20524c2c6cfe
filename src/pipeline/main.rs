use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use overlay_dashboard::{records::load_csv, Chart, DashboardConfig, DateRange};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "Batch overlay computation for bar data with support/resistance annotations")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute overlay layers for a date range and write them as JSON
    Export {
        /// CSV file with the bar data
        #[arg(short, long, default_value = "tsla_data.csv")]
        data: PathBuf,

        /// First visible date (YYYY-MM-DD), defaults to the first bar
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last visible date (YYYY-MM-DD), defaults to the last bar
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Distance between entry markers and the bar's low/high
        #[arg(long, default_value = "2.0")]
        marker_offset: f64,
    },

    /// Log marker and band counts for a date range
    Summary {
        /// CSV file with the bar data
        #[arg(short, long, default_value = "tsla_data.csv")]
        data: PathBuf,

        /// First date (YYYY-MM-DD), defaults to the first bar
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last date (YYYY-MM-DD), defaults to the last bar
        #[arg(short, long)]
        end: Option<NaiveDate>,
    },
}

fn load_chart(data: &Path, marker_offset: f64) -> Result<Chart> {
    let config = DashboardConfig {
        data_path: data.to_path_buf(),
        marker_offset,
        ..Default::default()
    };
    let bars = load_csv(&config.data_path)?;
    Chart::new(bars, &config)
}

fn resolve(chart: &Chart, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DateRange> {
    chart
        .resolve_range(start, end)
        .context("No bars loaded; pass both --start and --end")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Commands::Export {
            data,
            start,
            end,
            output,
            marker_offset,
        } => {
            let chart = load_chart(&data, marker_offset)?;
            let range = resolve(&chart, start, end)?;
            let overlays = chart.overlays(&range);
            let json = serde_json::to_string_pretty(&overlays)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!(
                        "Wrote {} layers ({} bars, {}) to {:?}",
                        overlays.layers.len(),
                        overlays.visible_bars,
                        range,
                        path
                    );
                }
                None => println!("{}", json),
            }
        }

        Commands::Summary { data, start, end } => {
            let chart = load_chart(&data, DashboardConfig::default().marker_offset)?;
            let range = resolve(&chart, start, end)?;
            let summary = chart.summary(&range);

            info!("=== Summary for {} ===", range);
            info!("Visible bars:     {}", summary.visible_bars);
            info!("Long entries:     {}", summary.long_entries);
            info!("Short entries:    {}", summary.short_entries);
            info!("Neutral bars:     {}", summary.neutral);
            info!("Support bands:    {}", summary.support_bands);
            info!("Resistance bands: {}", summary.resistance_bands);
        }
    }

    Ok(())
}
