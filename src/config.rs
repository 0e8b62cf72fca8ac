use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level configuration for both jobs. Loaded from `config.toml` when one
/// is present, otherwise every field falls back to the documented default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub aggregation: AggregationConfig,
}

/// Buckets and keys used by the expiry-filter transform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket holding the raw facility feed.
    pub raw_bucket: String,
    /// Key of the newline-delimited raw feed.
    pub raw_key: String,
    /// Bucket the filtered output is written to.
    pub transformed_bucket: String,
    /// Key of the filtered output artifact (fully overwritten each run).
    pub transformed_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_bucket: "healthcare-facility".to_string(),
            raw_key: "raw/sample_facility_data.json".to_string(),
            transformed_bucket: "healthcare-facility".to_string(),
            transformed_key: "transformed/expiring_facilities.json".to_string(),
        }
    }
}

/// Query database, locations, and polling budget for the aggregation job.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Database the state-counts query runs against.
    pub database: String,
    /// Transient location query results land in before archiving.
    pub query_output_location: String,
    /// Bucket the timestamped archive copy is written to.
    pub archive_bucket: String,
    /// Key prefix of the archive copy.
    pub archive_prefix: String,
    /// Poll budget: attempts x delay bounds how long the job waits.
    pub max_poll_attempts: u32,
    pub poll_delay_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            database: "healthcare_facility_db".to_string(),
            query_output_location: "s3://healthcare-facility/athena_results/".to_string(),
            archive_bucket: "healthcare-facility".to_string(),
            archive_prefix: "transformed/".to_string(),
            max_poll_attempts: 20,
            poll_delay_secs: 3,
        }
    }
}

impl AggregationConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs)
    }
}

impl PipelineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            crate::error::PipelineError::Config(format!(
                "Failed to read config file '{path}': {e}"
            ))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads `config.toml` from the working directory, falling back to the
    /// built-in defaults when the file does not exist.
    pub fn load_or_default() -> Result<Self> {
        let path = "config.toml";
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!("No config.toml found, using default configuration");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.storage.raw_bucket, "healthcare-facility");
        assert_eq!(config.storage.raw_key, "raw/sample_facility_data.json");
        assert_eq!(
            config.storage.transformed_key,
            "transformed/expiring_facilities.json"
        );
        assert_eq!(config.aggregation.database, "healthcare_facility_db");
        assert_eq!(config.aggregation.max_poll_attempts, 20);
        assert_eq!(config.aggregation.poll_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let toml_src = r#"
            [storage]
            raw_bucket = "facility-staging"

            [aggregation]
            max_poll_attempts = 5
        "#;
        let config: PipelineConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.storage.raw_bucket, "facility-staging");
        assert_eq!(config.storage.raw_key, "raw/sample_facility_data.json");
        assert_eq!(config.aggregation.max_poll_attempts, 5);
        assert_eq!(config.aggregation.poll_delay_secs, 3);
    }
}
