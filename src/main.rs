use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fxdaily::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxdaily::AppCommand {
    fn from(cmd: Commands) -> fxdaily::AppCommand {
        match cmd {
            Commands::Run { date } => fxdaily::AppCommand::Run { date },
            Commands::Backfill { from, to } => fxdaily::AppCommand::Backfill { from, to },
            Commands::Latest => fxdaily::AppCommand::Latest,
            Commands::Currencies => fxdaily::AppCommand::Currencies,
            Commands::Download { date, output } => fxdaily::AppCommand::Download { date, output },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration and data directory
    Setup,
    /// Fetch, store and publish rates for one date
    Run {
        /// Date to process (YYYY-MM-DD), defaults to yesterday
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Run the pipeline for every date in a range
    Backfill {
        /// First date (YYYY-MM-DD), defaults to pipeline.start_date
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Display the latest exchange rates
    Latest,
    /// List currencies known to the rates API
    Currencies,
    /// Download a published file from object storage
    Download {
        /// Date of the file (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        /// Where to save the file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxdaily::cli::setup::setup(),
        Some(cmd) => fxdaily::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
