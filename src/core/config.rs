use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

fn default_api_base_url() -> String {
    "https://openexchangerates.org/api".to_string()
}

fn default_base_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub app_id: String,
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// The free API tier only serves USD based rates.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Gcs {
        project_id: Option<String>,
        credentials: String,
        bucket: String,
    },
    Local {
        root: String,
    },
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_retries")]
    pub retries: usize,
    #[serde(default = "PipelineConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    pub start_date: Option<NaiveDate>,
    #[serde(default = "PipelineConfig::default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

impl PipelineConfig {
    fn default_retries() -> usize {
        1
    }

    fn default_retry_delay_ms() -> u64 {
        1000
    }

    fn default_max_concurrent_runs() -> usize {
        4
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            retries: Self::default_retries(),
            retry_delay_ms: Self::default_retry_delay_ms(),
            start_date: None,
            max_concurrent_runs: Self::default_max_concurrent_runs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub data_root: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "fxdaily", "fxdaily")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_root() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "fxdaily", "fxdaily")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("data"))
    }

    /// Root under which `{base}/{date}.parquet` files are materialized.
    /// Always absolute so remote keys can be derived by stripping it.
    pub fn data_root(&self) -> Result<PathBuf> {
        let root = match &self.data_root {
            Some(custom_path) => PathBuf::from(custom_path),
            None => Self::default_data_root()?,
        };
        std::path::absolute(&root)
            .with_context(|| format!("Failed to resolve data root: {}", root.display()))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.app_id.trim().is_empty() {
            anyhow::bail!("api.app_id must not be empty");
        }
        if self.api.base_currency.trim().is_empty() {
            anyhow::bail!("api.base_currency must not be empty");
        }
        if self.pipeline.max_concurrent_runs == 0 {
            anyhow::bail!("pipeline.max_concurrent_runs must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
api:
  app_id: "abc123"
storage:
  kind: gcs
  project_id: "my-project"
  credentials: "/etc/fxdaily/credentials.json"
  bucket: "fx-archive"
data_root: "/var/lib/fxdaily"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.api.app_id, "abc123");
        assert_eq!(config.api.base_url, "https://openexchangerates.org/api");
        assert_eq!(config.api.base_currency, "USD");
        if let StorageConfig::Gcs {
            project_id,
            credentials,
            bucket,
        } = &config.storage
        {
            assert_eq!(project_id.as_deref(), Some("my-project"));
            assert_eq!(credentials, "/etc/fxdaily/credentials.json");
            assert_eq!(bucket, "fx-archive");
        } else {
            panic!("Expected gcs storage");
        }
        assert_eq!(config.pipeline.retries, 1);
        assert_eq!(config.pipeline.retry_delay_ms, 1000);
        assert_eq!(config.pipeline.max_concurrent_runs, 4);
        assert!(config.pipeline.start_date.is_none());
        assert_eq!(config.data_root().unwrap(), PathBuf::from("/var/lib/fxdaily"));
    }

    #[test]
    fn test_config_with_pipeline_overrides() {
        let yaml_str = r#"
api:
  app_id: "abc123"
  base_url: "http://localhost:8080/api"
storage:
  kind: local
  root: "/tmp/bucket"
pipeline:
  retries: 3
  retry_delay_ms: 10
  start_date: 2024-07-01
  max_concurrent_runs: 2
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert!(matches!(config.storage, StorageConfig::Local { ref root } if root == "/tmp/bucket"));
        assert_eq!(config.pipeline.retries, 3);
        assert_eq!(config.pipeline.retry_delay_ms, 10);
        assert_eq!(
            config.pipeline.start_date,
            NaiveDate::from_ymd_opt(2024, 7, 1)
        );
        assert_eq!(config.pipeline.max_concurrent_runs, 2);
    }

    #[test]
    fn test_validate_rejects_empty_app_id() {
        let yaml_str = r#"
api:
  app_id: "  "
storage:
  kind: memory
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.app_id"));
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "api: [").unwrap();
        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
