pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{RateProvider, RateRecord};
use crate::pipeline::{Pipeline, RetryPolicy};
use crate::providers::openexchangerates::OpenExchangeRatesProvider;
use crate::store::{BucketStorage, ObjectStorage, parquet};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Run the pipeline for one date; defaults to yesterday.
    Run { date: Option<NaiveDate> },
    /// Run the pipeline for every date in an inclusive range.
    Backfill {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    Latest,
    Currencies,
    /// Fetch a published file back from object storage.
    Download {
        date: NaiveDate,
        output: Option<PathBuf>,
    },
}

/// Logical date of today's scheduled run: the day that just ended (UTC).
pub fn default_run_date() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(1)
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn build_provider(config: &AppConfig) -> Result<Arc<OpenExchangeRatesProvider>> {
    let provider = OpenExchangeRatesProvider::new(
        &config.api.base_url,
        &config.api.app_id,
        &config.api.base_currency,
    )
    .context("Failed to create exchange rate client")?;
    Ok(Arc::new(provider))
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let provider = build_provider(config)?;
    let storage = Arc::new(BucketStorage::from_config(&config.storage)?);
    let data_root = config.data_root()?;
    info!(data_root = %data_root.display(), bucket = storage.bucket(), "Pipeline ready");

    Ok(Pipeline::new(provider, storage, data_root).with_retry_policy(RetryPolicy {
        retries: config.pipeline.retries,
        delay: std::time::Duration::from_millis(config.pipeline.retry_delay_ms),
    }))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Run { date } => {
            let pipeline = build_pipeline(&config)?;
            let date = date.unwrap_or_else(default_run_date);
            let report = pipeline.run(date).await?;
            println!("{}", cli::run::display_report(&report));
            Ok(())
        }
        AppCommand::Backfill { from, to } => {
            let from = from
                .or(config.pipeline.start_date)
                .context("No start date: pass --from or set pipeline.start_date")?;
            let to = to.unwrap_or_else(default_run_date);
            if from > to {
                anyhow::bail!("Backfill start {from} is after end {to}");
            }
            let pipeline = build_pipeline(&config)?;
            cli::run::backfill(&pipeline, from, to, config.pipeline.max_concurrent_runs).await
        }
        AppCommand::Latest => {
            let provider = build_provider(&config)?;
            let record: RateRecord = provider.latest().await?;
            println!("{}", cli::rates::display_rates(&record));
            Ok(())
        }
        AppCommand::Currencies => {
            let provider = build_provider(&config)?;
            let currencies = provider.currencies().await?;
            println!("{}", cli::rates::display_currencies(&currencies));
            Ok(())
        }
        AppCommand::Download { date, output } => {
            let storage = BucketStorage::from_config(&config.storage)?;
            let data_root = config.data_root()?;
            let base = &config.api.base_currency;
            let local = parquet::local_path(&data_root, base, date);
            let key = parquet::remote_key(&data_root, &local)?;
            // Without --output the file is restored into the local layout
            let output = output.unwrap_or(local);
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }

            storage.download(&key, &output).await?;
            let mut record = parquet::read_rates(&output)
                .with_context(|| format!("Downloaded file is not readable: {}", output.display()))?;
            record.base = base.clone();
            println!("{}", cli::rates::display_rates(&record));
            println!("Saved {} to {}", key, output.display());
            Ok(())
        }
    }
}
