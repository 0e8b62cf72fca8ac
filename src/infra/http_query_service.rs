use crate::app::ports::{QueryHandle, QueryServicePort, QueryState};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Query execution adapter for a query HTTP API: POST submits an execution,
/// GET reports its state and, once finished, the result file location.
/// Config via env:
/// - FACILITY_QUERY_API_URL (base URL of the query service)
/// - FACILITY_QUERY_API_TOKEN (optional bearer token)
pub struct HttpQueryService {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    query_execution_id: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionStatus {
    state: QueryState,
    #[serde(default)]
    output_location: Option<String>,
}

impl HttpQueryService {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("FACILITY_QUERY_API_URL").ok()?;
        let token = std::env::var("FACILITY_QUERY_API_TOKEN").ok();
        Some(Self::new(base_url, token))
    }

    fn executions_url(&self) -> String {
        format!("{}/v1/queries", self.base_url.trim_end_matches('/'))
    }

    fn execution_url(&self, handle: &QueryHandle) -> String {
        format!("{}/{}", self.executions_url(), handle)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn fetch_status(&self, handle: &QueryHandle) -> Result<ExecutionStatus> {
        let resp = self
            .authorize(self.client.get(self.execution_url(handle)))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Query(format!(
                "status fetch for {handle} failed: {status} - {body}"
            )));
        }
        Ok(resp.json::<ExecutionStatus>().await?)
    }
}

#[async_trait]
impl QueryServicePort for HttpQueryService {
    async fn submit_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<QueryHandle> {
        let payload = json!({
            "query": query,
            "database": database,
            "output_location": output_location,
        });
        let resp = self
            .authorize(self.client.post(self.executions_url()))
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Query(format!(
                "query submission failed: {status} - {body}"
            )));
        }
        let submitted = resp.json::<SubmitResponse>().await?;
        debug!("Submitted query execution {}", submitted.query_execution_id);
        Ok(QueryHandle::new(submitted.query_execution_id))
    }

    async fn get_query_state(&self, handle: &QueryHandle) -> Result<QueryState> {
        Ok(self.fetch_status(handle).await?.state)
    }

    async fn get_output_location(&self, handle: &QueryHandle) -> Result<String> {
        self.fetch_status(handle)
            .await?
            .output_location
            .ok_or_else(|| {
                PipelineError::Query(format!(
                    "execution {handle} reported no output location"
                ))
            })
    }
}
