use clap::{Parser, Subcommand};
use overdose_prep::cli;
use overdose_prep::error::PrepResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "overdose-prep")]
#[command(about = "Reshape the overdose mortality workbook into long-format Parquet tables.")]
#[command(long_about = "Overdose prep - workbook to Parquet reshaping

Reads the counts, rates and demographic sheets named in the configuration,
extracts every configured row for 1999-2021 and writes three tables:

  overall.parquet   - general categories (drug type, sex)
  specific.parquet  - sub-categories with in-category percentage
  demo.parquet      - demographic rates

COMMANDS:
  run     - Build and write all tables
  check   - Validate the configuration file

EXAMPLES:
  overdose-prep run
  overdose-prep run --input raw.xlsx --output-dir out/
  overdose-prep run --dry-run --json
  overdose-prep check --config config/overdose.yaml")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all tables and write them as Parquet
    Run {
        /// Path to YAML configuration
        #[arg(short, long, default_value = "config/overdose.yaml", env = "OVERDOSE_PREP_CONFIG")]
        config: PathBuf,

        /// Workbook to read (overrides the configured input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for the Parquet files (overrides the configured output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Build tables without writing any file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the configuration only
    Check {
        /// Path to YAML configuration
        #[arg(short, long, default_value = "config/overdose.yaml", env = "OVERDOSE_PREP_CONFIG")]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "overdose_prep=debug"
    } else {
        "overdose_prep=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> PrepResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            input,
            output_dir,
            dry_run,
            json,
        } => cli::run(config, input, output_dir, dry_run, json),

        Commands::Check { config } => cli::check(config),
    }
}
