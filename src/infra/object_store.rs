use crate::app::ports::ObjectStorePort;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

fn not_found(bucket: &str, key: &str) -> PipelineError {
    PipelineError::Storage {
        uri: format!("{bucket}/{key}"),
        message: "object not found".to_string(),
    }
}

/// In-memory object store implementation for development/testing.
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorePort for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert((bucket.to_string(), key.to_string()), body);
        debug!("Stored object {}/{}", bucket, key);
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        let body = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(src_bucket, src_key))?;
        objects.insert((dest_bucket.to_string(), dest_key.to_string()), body);
        debug!(
            "Copied object {}/{} to {}/{}",
            src_bucket, src_key, dest_bucket, dest_key
        );
        Ok(())
    }
}

/// Filesystem-backed object store: objects live at `<root>/<bucket>/<key>`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        fs::read(&path).map_err(|e| PipelineError::Storage {
            uri: format!("{bucket}/{key}"),
            message: e.to_string(),
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        debug!("Wrote object to {}", path.display());
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let body = self.get_object(src_bucket, src_key).await?;
        self.put_object(dest_bucket, dest_key, body).await
    }
}
