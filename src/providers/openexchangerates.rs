use crate::core::{PipelineError, RateProvider, RateRecord};
use crate::store::parquet;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

#[derive(Debug, Deserialize)]
struct RatesResponse {
    timestamp: Option<i64>,
    base: Option<String>,
    rates: Option<BTreeMap<String, f64>>,
}

impl RatesResponse {
    /// Validates the payload. `target` identifies the request in errors.
    /// The record's date is the UTC calendar day of `timestamp`.
    fn into_record(self, target: &str) -> Result<RateRecord, PipelineError> {
        let base = self
            .base
            .filter(|b| !b.is_empty())
            .ok_or_else(|| PipelineError::upstream(target, format!("No base for {target}")))?;
        if !parquet::is_currency_code(&base) {
            return Err(PipelineError::upstream(
                target,
                format!("Invalid base {base:?} for {target}"),
            ));
        }

        let rates = self
            .rates
            .filter(|r| !r.is_empty())
            .ok_or_else(|| PipelineError::upstream(target, format!("No rates for {target}")))?;

        let timestamp = self
            .timestamp
            .ok_or_else(|| PipelineError::upstream(target, format!("No timestamp for {target}")))?;
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| {
                PipelineError::upstream(target, format!("Invalid timestamp {timestamp}"))
            })?
            .date_naive();

        Ok(RateRecord { date, base, rates })
    }
}

/// Client for the Open Exchange Rates REST API.
pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    base_currency: String,
    client: reqwest::Client,
}

impl OpenExchangeRatesProvider {
    pub fn new(base_url: &str, app_id: &str, base_currency: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxdaily/1.0")
            .build()?;
        Ok(OpenExchangeRatesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            base_currency: base_currency.to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        target: &str,
        with_base: bool,
    ) -> Result<T, PipelineError> {
        let mut params = vec![("app_id", self.app_id.as_str())];
        if with_base {
            params.push(("base", self.base_currency.as_str()));
        }
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), &params)
            .map_err(|e| PipelineError::upstream(target, format!("Invalid API URL: {e}")))?;
        debug!(endpoint, "Requesting exchange rate data");

        let response = self.client.get(url).send().await.map_err(|e| {
            PipelineError::upstream(target, format!("Request error: {}", e.without_url()))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Upstream {
                target: target.to_string(),
                status: Some(status.as_u16()),
                message: format!("Error fetching data from API: HTTP {status}"),
            });
        }

        let text = response.text().await.map_err(|e| {
            PipelineError::upstream(target, format!("Failed to read response: {}", e.without_url()))
        })?;

        serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse exchange rate response");
            PipelineError::upstream(target, format!("Failed to parse JSON response: {e}"))
        })
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn base_currency(&self) -> &str {
        &self.base_currency
    }

    #[instrument(name = "HistoricalRatesFetch", skip(self), fields(date = %date))]
    async fn historical(&self, date: NaiveDate) -> Result<RateRecord, PipelineError> {
        let target = date.format("%Y-%m-%d").to_string();
        let endpoint = format!("historical/{target}.json");
        let response: RatesResponse = self.get_json(&endpoint, &target, true).await?;
        response.into_record(&target)
    }

    async fn latest(&self) -> Result<RateRecord, PipelineError> {
        let response: RatesResponse = self.get_json("latest.json", "latest", true).await?;
        response.into_record("latest")
    }

    async fn currencies(&self) -> Result<BTreeMap<String, String>, PipelineError> {
        self.get_json("currencies.json", "currencies", false).await
    }
}
