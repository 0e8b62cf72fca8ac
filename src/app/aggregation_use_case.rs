use crate::app::ports::{ObjectStorePort, QueryServicePort, QueryState};
use crate::clock::Clock;
use crate::config::AggregationConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::aggregation::archive::ResultArchiver;
use crate::pipeline::aggregation::polling::{poll_until_terminal, PollConfig};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Per-state counts of distinct facilities holding at least one
/// accreditation, rendered against the configured database.
pub fn state_counts_query(database: &str) -> String {
    format!(
        "SELECT \
             location.state, \
             COUNT(DISTINCT facility_id) AS accredited_facility_count \
         FROM {database}.raw \
         WHERE cardinality(accreditations) > 0 \
         GROUP BY location.state"
    )
}

/// Payload returned to the invoking runtime on success.
#[derive(Debug, Serialize)]
pub struct AggregationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: AggregationBody,
}

#[derive(Debug, Serialize)]
pub struct AggregationBody {
    pub message: String,
    pub result_path: String,
}

/// Aggregation-and-archive job: submit the state-counts query, poll it to a
/// terminal state, and copy the result into the durable archive. Any
/// non-succeeded outcome is fatal and surfaces to the caller.
pub struct AggregationUseCase {
    store: Arc<dyn ObjectStorePort>,
    query_service: Arc<dyn QueryServicePort>,
    clock: Arc<dyn Clock>,
    config: AggregationConfig,
}

impl AggregationUseCase {
    pub fn new(
        store: Arc<dyn ObjectStorePort>,
        query_service: Arc<dyn QueryServicePort>,
        clock: Arc<dyn Clock>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            store,
            query_service,
            clock,
            config,
        }
    }

    /// Runs one aggregation pass. The trigger event payload is logged for
    /// traceability but not otherwise inspected.
    pub async fn run(&self, event: &serde_json::Value) -> Result<AggregationResponse> {
        info!("Received event: {}", event);
        counter!("facility_aggregation_runs_total").increment(1);
        let started = std::time::Instant::now();

        let query = state_counts_query(&self.config.database);
        info!(
            "Using query output location: {}",
            self.config.query_output_location
        );
        let handle = self
            .query_service
            .submit_query(
                &query,
                &self.config.database,
                &self.config.query_output_location,
            )
            .await?;
        info!("Started query execution {}", handle);

        let poll_config = PollConfig {
            max_attempts: self.config.max_poll_attempts,
            delay: self.config.poll_delay(),
        };
        let state =
            poll_until_terminal(self.query_service.as_ref(), &handle, &poll_config).await?;

        if state != QueryState::Succeeded {
            error!("State counts query did not succeed, final state: {}", state);
            return Err(PipelineError::QueryFailed {
                handle: handle.to_string(),
                state,
            });
        }

        let archiver = ResultArchiver::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.archive_bucket.clone(),
            self.config.archive_prefix.clone(),
        );
        let result_path = archiver.archive(self.query_service.as_ref(), &handle).await?;
        info!("State counts written to {}", result_path);

        histogram!("facility_aggregation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(AggregationResponse {
            status_code: 200,
            body: AggregationBody {
                message: "State counts query completed".to_string(),
                result_path,
            },
        })
    }
}
