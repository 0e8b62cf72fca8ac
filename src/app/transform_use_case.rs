use crate::app::ports::ObjectStorePort;
use crate::clock::Clock;
use crate::config::StorageConfig;
use crate::pipeline::processing::expiry::ExpiryFilter;
use crate::pipeline::processing::parser::parse_facility_lines;
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Result of a complete transform run.
#[derive(Debug, Serialize)]
pub struct TransformSummary {
    pub total_facilities: usize,
    pub expiring_facilities: usize,
    pub output_uri: String,
    pub errors: Vec<String>,
}

/// Expiry-filter job: fetch the raw feed, parse it, keep facilities with an
/// accreditation expiring within the horizon, and overwrite the transformed
/// artifact. The job never raises; fetch and write failures are logged and
/// reported in the summary so a scheduler sees a clean exit.
pub struct TransformUseCase {
    store: Arc<dyn ObjectStorePort>,
    filter: ExpiryFilter,
    config: StorageConfig,
}

impl TransformUseCase {
    pub fn new(
        store: Arc<dyn ObjectStorePort>,
        clock: Arc<dyn Clock>,
        config: StorageConfig,
    ) -> Self {
        Self {
            store,
            filter: ExpiryFilter::new(clock),
            config,
        }
    }

    async fn fetch_raw_body(&self, errors: &mut Vec<String>) -> String {
        let uri = format!("{}/{}", self.config.raw_bucket, self.config.raw_key);
        info!("Reading input object {}", uri);
        match self
            .store
            .get_object(&self.config.raw_bucket, &self.config.raw_key)
            .await
        {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                // Treated the same as an empty feed so the run still completes,
                // but loudly enough that an outage is visible.
                error!("Failed to read input object {}: {}", uri, e);
                errors.push(format!("fetch {uri}: {e}"));
                String::new()
            }
        }
    }

    pub async fn run(&self) -> TransformSummary {
        info!("Starting facility transform run");
        counter!("facility_transform_runs_total").increment(1);
        let started = std::time::Instant::now();
        let mut errors = Vec::new();

        let body = self.fetch_raw_body(&mut errors).await;
        let facilities = parse_facility_lines(&body);
        let total = facilities.len();
        info!(
            "Found {} facilities in {}/{}",
            total, self.config.raw_bucket, self.config.raw_key
        );
        counter!("facility_records_parsed_total").increment(total as u64);

        let expiring = self.filter.filter(facilities);
        counter!("facility_records_expiring_total").increment(expiring.len() as u64);

        let output_uri = format!(
            "{}/{}",
            self.config.transformed_bucket, self.config.transformed_key
        );
        match serde_json::to_vec(&expiring) {
            Ok(payload) => {
                info!("Writing {} facilities to {}", expiring.len(), output_uri);
                if let Err(e) = self
                    .store
                    .put_object(
                        &self.config.transformed_bucket,
                        &self.config.transformed_key,
                        payload,
                    )
                    .await
                {
                    error!("Failed to write to {}: {}", output_uri, e);
                    errors.push(format!("write {output_uri}: {e}"));
                }
            }
            Err(e) => {
                error!("Failed to serialize filtered facilities: {}", e);
                errors.push(format!("serialize: {e}"));
            }
        }

        histogram!("facility_transform_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!("Transform run completed with {} errors", errors.len());

        TransformSummary {
            total_facilities: total,
            expiring_facilities: expiring.len(),
            output_uri,
            errors,
        }
    }
}
