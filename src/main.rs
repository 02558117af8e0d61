use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

mod config;
mod constants;
mod domain;
mod error;
mod logging;
mod pipeline;
mod storage;
mod summary;

use crate::config::EtlConfig;
use crate::error::Result;
use crate::summary::RunSummary;

#[derive(Parser)]
#[command(name = "hr_insights")]
#[command(about = "HR analytics ETL: raw CSV exports in, dashboard tables out")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the pipeline configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Override the raw data directory from the config
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Override the processed data directory from the config
    #[arg(long, global = true)]
    processed_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL pipeline and publish the processed tables
    Run,
    /// Validate the raw tables without writing any output
    Validate,
    /// Print the summary of the last successful run
    Summary,
}

fn load_config(cli: &Cli) -> Result<EtlConfig> {
    let mut config = EtlConfig::load(&cli.config)?;
    if let Some(raw_dir) = &cli.raw_dir {
        config.data.raw_dir = raw_dir.clone();
    }
    if let Some(processed_dir) = &cli.processed_dir {
        config.data.processed_dir = processed_dir.clone();
    }
    Ok(config)
}

fn print_summary(summary: &RunSummary, with_outputs: bool) {
    println!("\n📊 Run {} summary:", summary.run_id);
    println!("   Rows loaded:   {}", summary.rows_loaded());
    println!("   Rows rejected: {}", summary.rows_rejected());

    for report in &summary.inputs {
        if report.rows_rejected == 0 {
            continue;
        }
        println!(
            "\n⚠️  {}: {} row(s) skipped",
            report.table, report.rows_rejected
        );
        for rejection in report.rejections.iter().take(10) {
            println!("   - line {}: {}", rejection.line, rejection.reason);
        }
        if report.rejections.len() > 10 {
            println!("   ... and {} more", report.rejections.len() - 10);
        }
    }

    if with_outputs && !summary.outputs.is_empty() {
        println!("\n📁 Published tables:");
        for output in &summary.outputs {
            println!("   {:<24} {} rows", output.table, output.rows);
        }
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            eprintln!("❌ Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run => {
            println!("🔄 Running ETL pipeline...");
            match pipeline::run_pipeline(&config) {
                Ok(summary) => {
                    print_summary(&summary, true);
                    println!("\n✅ ETL run completed successfully");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("ETL run failed: {e}");
                    eprintln!("❌ ETL run failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Validate => {
            println!("🔍 Validating raw tables...");
            match pipeline::validate_only(&config) {
                Ok(summary) => {
                    print_summary(&summary, false);
                    println!("\n✅ Validation passed");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("validation failed: {e}");
                    eprintln!("❌ Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Summary => match storage::read_summary(&config.data.processed_dir) {
            Ok(summary) => {
                print_summary(&summary, true);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ No run summary available: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
