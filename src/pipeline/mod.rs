//! Ordered task list and the driver that runs it for one date at a time.
//!
//! Tasks run strictly in [`Task::ORDER`]; each task consumes the [`Handoff`]
//! produced by the previous one. A failing task is retried according to the
//! pipeline's [`RetryPolicy`] before the run is reported as failed.

pub mod retry;
pub mod tasks;

use crate::core::{PipelineError, RateProvider, RateRecord};
use crate::store::ObjectStorage;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

pub use retry::RetryPolicy;
pub use tasks::Published;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    FetchExchangeRates,
    ProcessData,
    StoreData,
    CleanupTemporaryStorage,
}

impl Task {
    pub const ORDER: [Task; 4] = [
        Task::FetchExchangeRates,
        Task::ProcessData,
        Task::StoreData,
        Task::CleanupTemporaryStorage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::FetchExchangeRates => "fetch_exchange_rates",
            Task::ProcessData => "process_data",
            Task::StoreData => "store_data",
            Task::CleanupTemporaryStorage => "cleanup_temporary_storage",
        }
    }

    fn expected_input(&self) -> &'static str {
        match self {
            Task::FetchExchangeRates => "a date",
            Task::ProcessData => "a rate record",
            Task::StoreData => "a file path",
            Task::CleanupTemporaryStorage => "a published file",
        }
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Value passed from one task to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Handoff {
    Date(NaiveDate),
    Record(RateRecord),
    File(PathBuf),
    Published(Published),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub task: Task,
    pub attempts: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub date: NaiveDate,
    /// Date carried by the provider's response; usually equal to `date`.
    pub published_date: NaiveDate,
    pub base: String,
    pub currencies: usize,
    pub remote_key: String,
    pub tasks: Vec<TaskRun>,
}

#[derive(Debug, Error)]
#[error("Task {task} failed for {date} after {attempts} attempt(s): {source}")]
pub struct RunFailure {
    pub date: NaiveDate,
    pub task: Task,
    pub attempts: usize,
    #[source]
    pub source: PipelineError,
}

pub type RunOutcome = Result<RunReport, RunFailure>;

/// The daily exchange rate pipeline with its collaborators injected.
pub struct Pipeline {
    provider: Arc<dyn RateProvider>,
    storage: Arc<dyn ObjectStorage>,
    data_root: PathBuf,
    policy: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        storage: Arc<dyn ObjectStorage>,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        Pipeline {
            provider,
            storage,
            data_root: data_root.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    async fn execute(&self, task: Task, input: &Handoff) -> Result<Handoff, PipelineError> {
        match (task, input) {
            (Task::FetchExchangeRates, Handoff::Date(date)) => {
                tasks::fetch_exchange_rates(self.provider.as_ref(), *date)
                    .await
                    .map(Handoff::Record)
            }
            (Task::ProcessData, Handoff::Record(record)) => {
                tasks::process_data(&self.data_root, record).map(Handoff::File)
            }
            (Task::StoreData, Handoff::File(path)) => {
                tasks::store_data(self.storage.as_ref(), &self.data_root, path.clone())
                    .await
                    .map(Handoff::Published)
            }
            (Task::CleanupTemporaryStorage, Handoff::Published(published)) => {
                tasks::cleanup_temporary_storage(&published.path).map(|()| Handoff::Done)
            }
            (task, _) => Err(PipelineError::Wiring {
                task,
                expected: task.expected_input(),
            }),
        }
    }

    /// Runs every task for `date` in order.
    #[instrument(name = "PipelineRun", skip(self), fields(date = %date))]
    pub async fn run(&self, date: NaiveDate) -> RunOutcome {
        let mut handoff = Handoff::Date(date);
        let mut runs = Vec::with_capacity(Task::ORDER.len());
        let mut fetched = None;
        let mut published = None;

        for task in Task::ORDER {
            let (result, attempts) =
                retry::with_retry(|| self.execute(task, &handoff), self.policy).await;

            let next = match result {
                Ok(next) => next,
                Err(source) => {
                    error!(task = %task, attempts, error = %source, "Task failed");
                    return Err(RunFailure {
                        date,
                        task,
                        attempts,
                        source,
                    });
                }
            };
            info!(task = %task, attempts, "Task completed");

            match &next {
                Handoff::Record(record) => fetched = Some(record.clone()),
                Handoff::Published(file) => published = Some(file.clone()),
                _ => {}
            }

            runs.push(TaskRun { task, attempts });
            handoff = next;
        }

        let (Some(record), Some(published)) = (fetched, published) else {
            let task = Task::CleanupTemporaryStorage;
            return Err(RunFailure {
                date,
                task,
                attempts: 0,
                source: PipelineError::Wiring {
                    task,
                    expected: task.expected_input(),
                },
            });
        };
        Ok(RunReport {
            date,
            published_date: record.date,
            base: record.base,
            currencies: record.rates.len(),
            remote_key: published.key,
            tasks: runs,
        })
    }

    /// Runs each date in `from..=to` independently, at most `concurrency` at a
    /// time. `on_complete` sees every outcome as it finishes; the returned
    /// outcomes are ordered by date.
    pub async fn backfill<F>(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        concurrency: usize,
        mut on_complete: F,
    ) -> Vec<RunOutcome>
    where
        F: FnMut(&RunOutcome),
    {
        let dates: Vec<NaiveDate> = from.iter_days().take_while(|d| *d <= to).collect();
        info!(%from, %to, runs = dates.len(), concurrency, "Starting backfill");

        let mut outcomes: Vec<RunOutcome> = stream::iter(dates)
            .map(|date| self.run(date))
            .buffer_unordered(concurrency.max(1))
            .inspect(|outcome| on_complete(outcome))
            .collect()
            .await;

        outcomes.sort_by_key(outcome_date);
        outcomes
    }
}

/// The requested date of a run, whether it succeeded or not.
pub fn outcome_date(outcome: &RunOutcome) -> NaiveDate {
    match outcome {
        Ok(report) => report.date,
        Err(failure) => failure.date,
    }
}
