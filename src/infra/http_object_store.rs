use crate::app::ports::ObjectStorePort;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Object store adapter for a storage HTTP API.
/// Config via env:
/// - FACILITY_STORAGE_API_URL (base URL of the storage service)
/// - FACILITY_STORAGE_API_TOKEN (optional bearer token)
pub struct HttpObjectStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("FACILITY_STORAGE_API_URL").ok()?;
        let token = std::env::var("FACILITY_STORAGE_API_TOKEN").ok();
        Some(Self::new(base_url, token))
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.trim_end_matches('/'),
            bucket,
            key
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request
                .header("Authorization", format!("Bearer {token}"))
                .header("apikey", token.clone()),
            None => request,
        }
    }

    fn status_error(uri: String, status: reqwest::StatusCode, body: String) -> PipelineError {
        PipelineError::Storage {
            uri,
            message: format!("{status} - {body}"),
        }
    }
}

#[async_trait]
impl ObjectStorePort for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key);
        let resp = self.authorize(self.client.get(&url)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(format!("{bucket}/{key}"), status, body));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let url = self.object_url(bucket, key);
        debug!("Uploading {} bytes to {}", body.len(), url);
        let resp = self
            .authorize(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .query(&[("upsert", "true")])
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(format!("{bucket}/{key}"), status, text));
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/copy",
            self.base_url.trim_end_matches('/')
        );
        let payload = json!({
            "bucketId": src_bucket,
            "sourceKey": src_key,
            "destinationBucket": dest_bucket,
            "destinationKey": dest_key,
        });
        let resp = self
            .authorize(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(
                format!("{src_bucket}/{src_key}"),
                status,
                text,
            ));
        }
        Ok(())
    }
}
