use crate::app::ports::{QueryHandle, QueryServicePort, QueryState};
use crate::error::{PipelineError, Result};
use std::time::Duration;
use tracing::info;

/// Bounded polling budget: `max_attempts` state fetches with a fixed delay
/// between consecutive attempts.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(3),
        }
    }
}

/// Polls the query service until the execution reaches a terminal state,
/// returning that state immediately. Exhausting the attempt budget without
/// observing a terminal state is a timeout, distinct from the query itself
/// failing.
pub async fn poll_until_terminal(
    service: &dyn QueryServicePort,
    handle: &QueryHandle,
    config: &PollConfig,
) -> Result<QueryState> {
    for attempt in 1..=config.max_attempts {
        let state = service.get_query_state(handle).await?;
        info!("Query {} state: {} (attempt {})", handle, state, attempt);

        if state.is_terminal() {
            return Ok(state);
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.delay).await;
        }
    }

    Err(PipelineError::PollTimeout {
        handle: handle.to_string(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::query_service::InMemoryQueryService;

    fn no_delay(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_polling_stops_at_first_terminal_state() {
        let service = InMemoryQueryService::new(vec![
            QueryState::Running,
            QueryState::Running,
            QueryState::Succeeded,
        ]);
        let handle = service
            .submit_query("SELECT 1", "db", "s3://bucket/results/")
            .await
            .unwrap();

        let state = poll_until_terminal(&service, &handle, &no_delay(10))
            .await
            .unwrap();

        assert_eq!(state, QueryState::Succeeded);
        assert_eq!(service.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_state_ends_polling_immediately() {
        let service = InMemoryQueryService::new(vec![QueryState::Failed]);
        let handle = service
            .submit_query("SELECT 1", "db", "s3://bucket/results/")
            .await
            .unwrap();

        let state = poll_until_terminal(&service, &handle, &no_delay(10))
            .await
            .unwrap();

        assert_eq!(state, QueryState::Failed);
        assert_eq!(service.poll_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_raises_timeout_after_exact_attempts() {
        let service = InMemoryQueryService::new(vec![QueryState::Running]);
        let handle = service
            .submit_query("SELECT 1", "db", "s3://bucket/results/")
            .await
            .unwrap();

        let err = poll_until_terminal(&service, &handle, &no_delay(4))
            .await
            .unwrap_err();

        assert_eq!(service.poll_count(), 4);
        match err {
            PipelineError::PollTimeout { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected PollTimeout, got {other:?}"),
        }
    }
}
