use crate::domain::audio::Manifest;
use crate::infrastructure::storage::{BlobStore, StorageError};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Manifest persistence over the blob store, with an optional in-process
/// read cache keyed by `(document, voice)`.
///
/// The cache only ever mirrors what was last read from or written to
/// storage; `invalidate` drops the entry before touching storage so a
/// concurrent read cannot resurrect a removed manifest.
pub struct ManifestRepository {
    store: Arc<dyn BlobStore>,
    bucket: String,
    cache: Option<Cache<String, Arc<Manifest>>>,
}

impl ManifestRepository {
    pub fn new(store: Arc<dyn BlobStore>, bucket: String, cache_enabled: bool) -> Self {
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(500)
                    .time_to_idle(Duration::from_secs(30 * 60))
                    .build(),
            )
        } else {
            None
        };

        Self {
            store,
            bucket,
            cache,
        }
    }

    pub fn manifest_path(document_id: i64, voice_id: i64) -> String {
        format!("{document_id}/{voice_id}/manifest.json")
    }

    /// Prefix under which all of a pairing's objects live, chunks and
    /// manifest alike.
    pub fn pairing_prefix(document_id: i64, voice_id: i64) -> String {
        format!("{document_id}/{voice_id}")
    }

    pub async fn get(
        &self,
        document_id: i64,
        voice_id: i64,
    ) -> Result<Option<Arc<Manifest>>, StorageError> {
        let path = Self::manifest_path(document_id, voice_id);

        if let Some(cache) = &self.cache {
            if let Some(manifest) = cache.get(&path).await {
                tracing::debug!(path = %path, "Manifest cache hit");
                return Ok(Some(manifest));
            }
        }

        let Some(bytes) = self.store.download(&self.bucket, &path).await? else {
            return Ok(None);
        };

        let manifest: Manifest = match serde_json::from_slice(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                // A manifest that no longer parses is treated as absent so
                // generation can overwrite it.
                tracing::warn!(path = %path, error = %e, "Stored manifest is unreadable");
                return Ok(None);
            }
        };

        let manifest = Arc::new(manifest);
        if let Some(cache) = &self.cache {
            cache.insert(path, manifest.clone()).await;
        }
        Ok(Some(manifest))
    }

    /// Persist the manifest and return its public URL. Writing the manifest
    /// is the final step of a generation run; everything it references must
    /// already be uploaded.
    pub async fn put(&self, manifest: &Manifest) -> Result<String, StorageError> {
        let path = Self::manifest_path(manifest.document_id, manifest.voice_id);
        let bytes = serde_json::to_vec(manifest).map_err(|e| StorageError::Unexpected {
            status: 0,
            path: path.clone(),
            message: format!("manifest failed to serialize: {e}"),
        })?;

        let url = self
            .store
            .upload(&self.bucket, &path, bytes, MANIFEST_CONTENT_TYPE)
            .await?;

        if let Some(cache) = &self.cache {
            cache.insert(path, Arc::new(manifest.clone())).await;
        }
        Ok(url)
    }

    /// Remove every object of the pairing, manifest included. Used by
    /// forced regeneration before any new upload happens.
    pub async fn invalidate(&self, document_id: i64, voice_id: i64) -> Result<(), StorageError> {
        let path = Self::manifest_path(document_id, voice_id);
        if let Some(cache) = &self.cache {
            cache.invalidate(&path).await;
        }

        let prefix = Self::pairing_prefix(document_id, voice_id);
        let paths = self.store.list(&self.bucket, &prefix).await?;
        if paths.is_empty() {
            return Ok(());
        }

        tracing::info!(
            document_id,
            voice_id,
            object_count = paths.len(),
            "Removing previously generated objects"
        );
        self.store.remove(&self.bucket, &paths).await
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}
