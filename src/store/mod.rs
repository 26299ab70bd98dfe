// src/store/mod.rs

use async_trait::async_trait;
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::{
        download::Range,
        get::GetObjectRequest,
        upload::{Media, UploadObjectRequest, UploadType},
    },
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Object key for an uploaded report: `input/<filename>`.
pub fn input_key(filename: &str) -> String {
    format!("input/{}", filename)
}

/// Object storage used to keep a copy of every fetched report.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Copy the object at `key` to `local_path`.
    async fn get_to_local_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;
}

/// Google Cloud Storage, authenticated with application default credentials.
pub struct GcsBlobStore {
    client: Client,
}

impl GcsBlobStore {
    pub async fn new() -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| PipelineError::BlobStore(format!("authenticating GCS client: {}", e)))?;
        Ok(Self {
            client: Client::new(config),
        })
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut media = Media::new(key.to_string());
        media.content_type = content_type.to_string().into();
        let upload_type = UploadType::Simple(media);
        let request = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, bytes, &upload_type)
            .await
            .map_err(|e| {
                PipelineError::BlobStore(format!("uploading {} to gs://{}: {}", key, bucket, e))
            })?;
        debug!("uploaded gs://{}/{}", bucket, key);
        Ok(())
    }

    async fn get_to_local_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        let data = self
            .client
            .download_object(&request, &Range::default())
            .await
            .map_err(|e| {
                PipelineError::BlobStore(format!("downloading gs://{}/{}: {}", bucket, key, e))
            })?;

        write_local(local_path, &data).await?;
        info!(
            "copied gs://{}/{} → {} ({} bytes)",
            bucket,
            key,
            local_path.display(),
            data.len()
        );
        Ok(())
    }
}

/// Process-local store keyed by `(bucket, key)`.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        // A poisoned map is still consistent: every write is a single insert.
        self.objects.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_to_local_path(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let object = self.get(bucket, key).ok_or_else(|| {
            PipelineError::BlobStore(format!("no object gs://{}/{}", bucket, key))
        })?;
        write_local(local_path, &object.bytes).await
    }
}

async fn write_local(local_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(local_path, data).await?;
    Ok(())
}
