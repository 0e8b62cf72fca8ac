use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object storage boundary: the transform job reads and writes whole
/// objects, the aggregation job copies the query result into the archive.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()>;
}

/// Opaque identifier for one in-flight query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution states reported by the query service. Anything other than
/// `Running` is terminal and ends polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryState::Running)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryState::Running => "RUNNING",
            QueryState::Succeeded => "SUCCEEDED",
            QueryState::Failed => "FAILED",
            QueryState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Analytical query execution boundary. Submission returns immediately with
/// a handle; completion is observed by polling `get_query_state`.
#[async_trait]
pub trait QueryServicePort: Send + Sync {
    async fn submit_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<QueryHandle>;

    async fn get_query_state(&self, handle: &QueryHandle) -> Result<QueryState>;

    /// Fully qualified object URI of the execution's result file.
    async fn get_output_location(&self, handle: &QueryHandle) -> Result<String>;
}
