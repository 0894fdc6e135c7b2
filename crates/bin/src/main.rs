//! Fremantle CLI binary.
//!
//! Runs single-factor backtests over CSV inputs and prints or exports the
//! resulting performance report.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fremantle::{Backtest, BacktestConfig};
use fremantle_data::{CsvPaths, CsvSource, DataSource, DateRange, Symbol};
use fremantle_factors::available_factors;
use fremantle_output::{ExportFormat, write_report};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fremantle")]
#[command(about = "Fremantle: cross-sectional factor backtesting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one factor and report bucket returns and IC
    Run {
        /// JSON configuration file
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Factor name, or `raw:<field>[:asc|:desc]`
        #[arg(long)]
        factor: String,

        /// First date of the run (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last date of the run (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Restrict the universe to these symbols (comma separated)
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Write the report into this directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Export format (csv, json or pretty)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Score and simulate on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Print the rebalance dates of a run
    Schedule {
        /// JSON configuration file
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },

    /// List the built-in factors
    Factors,
}

/// Input CSV tables; individual paths override `--data-dir`.
#[derive(Args)]
struct DataArgs {
    /// Directory holding instruments.csv, fundamentals.csv, prices.csv and calendar.csv
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Instrument master table
    #[arg(long)]
    instruments: Option<PathBuf>,

    /// Fundamental records
    #[arg(long)]
    fundamentals: Option<PathBuf>,

    /// Daily price bars
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Trading calendar
    #[arg(long)]
    calendar: Option<PathBuf>,
}

impl DataArgs {
    fn source(self) -> CsvSource {
        let mut paths = CsvPaths::in_dir(&self.data_dir);
        if let Some(p) = self.instruments {
            paths.instruments = p;
        }
        if let Some(p) = self.fundamentals {
            paths.fundamentals = p;
        }
        if let Some(p) = self.prices {
            paths.prices = p;
        }
        if let Some(p) = self.calendar {
            paths.calendar = p;
        }
        CsvSource::new(paths)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            factor,
            start,
            end,
            symbols,
            output,
            format,
            sequential,
        } => {
            let format: ExportFormat = format.parse()?;
            let symbols: Vec<Symbol> = symbols.iter().map(|s| Symbol::new(s.trim())).collect();
            run_backtest(
                &config,
                &data.source(),
                &factor,
                DateRange::new(start, end)?,
                &symbols,
                output.as_deref().map(|dir| (dir, format)),
                !sequential,
            )?;
        }
        Commands::Schedule {
            config,
            data,
            start,
            end,
        } => {
            print_schedule(&config, &data.source(), DateRange::new(start, end)?)?;
        }
        Commands::Factors => list_factors(),
    }

    Ok(())
}

fn run_backtest(
    config: &Path,
    source: &CsvSource,
    factor: &str,
    range: DateRange,
    symbols: &[Symbol],
    output: Option<(&Path, ExportFormat)>,
    parallel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BacktestConfig::from_path(config)?;
    let backtest = Backtest::new(config)?.with_parallelism(parallel);

    info!(factor, start = %range.start, end = %range.end, "starting backtest");
    let pb = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message("Simulating rebalances...");

    let result = backtest.run_with_progress(source, factor, symbols, range, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    });
    let output_data = match result {
        Ok(out) => {
            pb.finish_with_message(format!("{} rebalances", out.simulation.events.len()));
            out
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    println!("{}", output_data.report.to_ascii_table());

    if let Some((dir, format)) = output {
        let written = write_report(&output_data.report, dir, format)?;
        for path in written {
            println!("  wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_schedule(
    config: &Path,
    source: &CsvSource,
    range: DateRange,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BacktestConfig::from_path(config)?;
    let backtest = Backtest::new(config)?;
    let calendar =
        source.fetch_calendar(&backtest.config().data.market, backtest.data_window(range))?;
    let schedule = backtest.schedule(range, &calendar);

    println!("Rebalance dates ({}):", schedule.dates.len());
    for date in &schedule.dates {
        println!("  {}", date);
    }
    if !schedule.skipped.is_empty() {
        println!("\nSkipped anchors ({}):", schedule.skipped.len());
        for skipped in &schedule.skipped {
            println!("  {}", skipped);
        }
    }
    Ok(())
}

fn list_factors() {
    println!("Built-in factors");
    println!("================\n");
    for info in available_factors() {
        println!(
            "  {:<20} {:<10} {:<10} {}",
            info.name,
            info.category.to_string(),
            info.direction.to_string(),
            info.description
        );
    }
    println!("\nAny field can be scored directly as raw:<field>[:asc|:desc].");
}
