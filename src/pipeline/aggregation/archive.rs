use crate::app::ports::{ObjectStorePort, QueryHandle, QueryServicePort};
use crate::clock::Clock;
use crate::error::{PipelineError, Result};
use std::sync::Arc;
use tracing::info;

/// A parsed `scheme://bucket/key` object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    pub fn to_uri(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

/// Splits an object URI into scheme, bucket, and key. All three parts must
/// be non-empty.
pub fn parse_object_uri(uri: &str) -> Result<ObjectUri> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| PipelineError::BadLocation(uri.to_string()))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| PipelineError::BadLocation(uri.to_string()))?;
    if scheme.is_empty() || bucket.is_empty() || key.is_empty() {
        return Err(PipelineError::BadLocation(uri.to_string()));
    }
    Ok(ObjectUri {
        scheme: scheme.to_string(),
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

/// Copies a finished query's result file out of its transient output
/// location into the durable archive under a timestamped name.
pub struct ResultArchiver {
    store: Arc<dyn ObjectStorePort>,
    clock: Arc<dyn Clock>,
    archive_bucket: String,
    archive_prefix: String,
}

impl ResultArchiver {
    pub fn new(
        store: Arc<dyn ObjectStorePort>,
        clock: Arc<dyn Clock>,
        archive_bucket: impl Into<String>,
        archive_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            archive_bucket: archive_bucket.into(),
            archive_prefix: archive_prefix.into(),
        }
    }

    /// Destination key for a copy made at this instant, second precision.
    fn destination_key(&self) -> String {
        let timestamp = self.clock.now().format("%Y%m%dT%H%M%SZ");
        format!("{}state_counts_{}.csv", self.archive_prefix, timestamp)
    }

    /// Resolves the execution's result location, copies the artifact into
    /// the archive, and returns the fully qualified destination URI. Both
    /// resolution and copy failures propagate.
    pub async fn archive(
        &self,
        query_service: &dyn QueryServicePort,
        handle: &QueryHandle,
    ) -> Result<String> {
        let output_location = query_service.get_output_location(handle).await?;
        let source = parse_object_uri(&output_location)?;
        let dest_key = self.destination_key();

        info!(
            "Copying query result from {} to {}://{}/{}",
            source.to_uri(),
            source.scheme,
            self.archive_bucket,
            dest_key
        );

        self.store
            .copy_object(&source.bucket, &source.key, &self.archive_bucket, &dest_key)
            .await?;

        Ok(format!(
            "{}://{}/{}",
            source.scheme, self.archive_bucket, dest_key
        ))
    }
}
