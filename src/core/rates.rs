//! Exchange rate abstractions and core types

use super::error::PipelineError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rates for one day, all quoted against `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub date: NaiveDate,
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// The currency every returned record is quoted against.
    fn base_currency(&self) -> &str;

    /// Rates published for `date`. The returned record's date comes from the
    /// provider's own timestamp and may differ from `date`.
    async fn historical(&self, date: NaiveDate) -> Result<RateRecord, PipelineError>;

    async fn latest(&self) -> Result<RateRecord, PipelineError>;

    /// Currency codes mapped to display names.
    async fn currencies(&self) -> Result<BTreeMap<String, String>, PipelineError>;
}
