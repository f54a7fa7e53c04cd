use super::{BlobStore, StorageError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Per-call timeout for storage requests. Source documents and audio chunks
/// can be tens of megabytes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum entries requested from a prefix listing. Chunk sets are bounded
/// well below this by the planner's duration targets.
const LIST_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

/// Supabase Storage REST implementation of [`BlobStore`], authenticated with
/// the service-role key.
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: String, service_key: String) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn unexpected(response: reqwest::Response, path: &str) -> StorageError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StorageError::Unexpected {
        status,
        path: path.to_string(),
        message,
    }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let response = self
            .http
            .get(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(unexpected(response, path).await);
        }

        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let response = self
            .http
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(unexpected(response, path).await);
        }

        tracing::debug!(bucket, path, size, "object uploaded");
        Ok(self.public_url(bucket, path))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let response = self
            .http
            .post(format!("{}/storage/v1/object/list/{}", self.base_url, bucket))
            .bearer_auth(&self.service_key)
            .json(&json!({ "prefix": prefix, "limit": LIST_LIMIT }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(unexpected(response, prefix).await);
        }

        let entries: Vec<ListedObject> = response.json().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                if prefix.is_empty() {
                    entry.name
                } else {
                    format!("{}/{}", prefix.trim_end_matches('/'), entry.name)
                }
            })
            .collect())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .delete(format!("{}/storage/v1/object/{}", self.base_url, bucket))
            .bearer_auth(&self.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(unexpected(response, &paths.join(",")).await);
        }

        tracing::debug!(bucket, removed = paths.len(), "objects removed");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_path_preserves_separators() {
        assert_eq!(encode_path("7/3/chunk-001.mp3"), "7/3/chunk-001.mp3");
    }

    #[test]
    fn encode_path_escapes_spaces() {
        assert_eq!(encode_path("7/el quijote.pdf"), "7/el%20quijote.pdf");
    }

    #[test]
    fn public_url_shape() {
        let store =
            SupabaseStorage::new("https://proj.supabase.co/".into(), "key".into()).unwrap();
        assert_eq!(
            store.public_url("book-audio", "7/3/manifest.json"),
            "https://proj.supabase.co/storage/v1/object/public/book-audio/7/3/manifest.json"
        );
    }
}
