mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::config::{ConfigArgs, ValidateConfigArgs};
use commands::score::ScoreArgs;

/// Liquidity manipulation and maturity mismatch risk scoring
#[derive(Parser)]
#[command(
    name = "lrs",
    version,
    about = "Liquidity manipulation and maturity mismatch risk scoring",
    long_about = "Scores multi-period financial statements for liquidity manipulation \
                  risk. Ratio drift rules (CR vs TACR, DSO escalation, CFO/PAT \
                  divergence) are blended with an isolation-forest anomaly score into \
                  a 0-100 Liquidity Risk Score and a Low/Medium/High/Critical bucket."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline stages to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every period of every entity in a financial table
    Score(ScoreArgs),
    /// Score a table and roll the results up to portfolio level
    Summary(ScoreArgs),
    /// Print the default engine configuration
    Config(ConfigArgs),
    /// Check a configuration file without scoring anything
    ValidateConfig(ValidateConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Score(args) => commands::score::run_score(args, cli.output),
        Commands::Summary(args) => commands::score::run_summary(args),
        Commands::Config(args) => {
            if let Err(e) = commands::config::run_config(args) {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
            return;
        }
        Commands::ValidateConfig(args) => commands::config::run_validate_config(args),
        Commands::Version => {
            println!("lrs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
