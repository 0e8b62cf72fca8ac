use crate::app::ports::{QueryHandle, QueryServicePort, QueryState};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// What a caller handed to `submit_query`, kept for assertions and for
/// resolving the execution's output location.
#[derive(Debug, Clone)]
pub struct Submission {
    pub query: String,
    pub database: String,
    pub output_location: String,
}

struct Inner {
    executions: HashMap<String, Submission>,
    script: Vec<QueryState>,
    cursor: usize,
    polls: usize,
    fixed_id: Option<String>,
}

/// In-memory query service for development/testing. Each `get_query_state`
/// call replays the next state from the configured script; the final state
/// repeats once the script is exhausted.
pub struct InMemoryQueryService {
    inner: Mutex<Inner>,
}

impl InMemoryQueryService {
    pub fn new(script: Vec<QueryState>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                executions: HashMap::new(),
                script,
                cursor: 0,
                polls: 0,
                fixed_id: None,
            }),
        }
    }

    /// Pins the next execution id instead of generating one, so tests can
    /// seed the result object at a predictable key.
    pub fn with_execution_id(self, id: impl Into<String>) -> Self {
        self.inner.lock().unwrap().fixed_id = Some(id.into());
        self
    }

    /// Number of `get_query_state` calls observed so far.
    pub fn poll_count(&self) -> usize {
        self.inner.lock().unwrap().polls
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.inner
            .lock()
            .unwrap()
            .executions
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QueryServicePort for InMemoryQueryService {
    async fn submit_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<QueryHandle> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner
            .fixed_id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        inner.executions.insert(
            id.clone(),
            Submission {
                query: query.to_string(),
                database: database.to_string(),
                output_location: output_location.to_string(),
            },
        );
        debug!("Accepted query execution {}", id);
        Ok(QueryHandle::new(id))
    }

    async fn get_query_state(&self, handle: &QueryHandle) -> Result<QueryState> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.executions.contains_key(handle.as_str()) {
            return Err(PipelineError::Query(format!(
                "unknown query execution {handle}"
            )));
        }
        let idx = inner.cursor.min(inner.script.len().saturating_sub(1));
        let state = *inner.script.get(idx).ok_or_else(|| {
            PipelineError::Query("query service has no scripted states".to_string())
        })?;
        inner.cursor += 1;
        inner.polls += 1;
        Ok(state)
    }

    async fn get_output_location(&self, handle: &QueryHandle) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        let submission = inner.executions.get(handle.as_str()).ok_or_else(|| {
            PipelineError::Query(format!("unknown query execution {handle}"))
        })?;
        let base = submission.output_location.trim_end_matches('/');
        Ok(format!("{}/{}.csv", base, handle))
    }
}
