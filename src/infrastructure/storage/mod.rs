pub mod supabase;

pub use supabase::SupabaseStorage;

use async_trait::async_trait;

/// Segment that Supabase-style public URLs embed before `<bucket>/<path>`.
const PUBLIC_OBJECT_SEGMENT: &str = "/storage/v1/object/public/";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage responded {status} for {path}: {message}")]
    Unexpected {
        status: u16,
        path: String,
        message: String,
    },
}

/// Content-addressed blob store shared by source documents, cached text
/// siblings, audio chunks and manifests.
///
/// Implementations must give `upload` upsert semantics so a crashed
/// generation run can safely be re-executed, and must report a missing
/// object as `Ok(None)` from `download` rather than as an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Upload (idempotent overwrite) and return the object's public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// List full object paths under a prefix.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// A `(bucket, path)` pair resolved from a catalog source location, which
/// may be a bare storage path or a fully-qualified public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub path: String,
}

impl ObjectLocation {
    pub fn resolve(raw: &str, default_bucket: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            if let Some(idx) = raw.find(PUBLIC_OBJECT_SEGMENT) {
                let rest = &raw[idx + PUBLIC_OBJECT_SEGMENT.len()..];
                let rest = rest.split(['?', '#']).next().unwrap_or(rest);
                if let Some((bucket, path)) = rest.split_once('/') {
                    return Self {
                        bucket: bucket.to_string(),
                        path: path.to_string(),
                    };
                }
            }
        }
        Self {
            bucket: default_bucket.to_string(),
            path: raw.to_string(),
        }
    }

    /// Path of the cached plain-text sibling: same logical name, `.txt`
    /// extension.
    pub fn text_sibling(&self) -> String {
        let (dir, name) = match self.path.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, self.path.as_str()),
        };
        let stem = match name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => name,
        };
        match dir {
            Some(dir) => format!("{dir}/{stem}.txt"),
            None => format!("{stem}.txt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_bare_path_uses_default_bucket() {
        let loc = ObjectLocation::resolve("7/moby-dick.pdf", "book-files");
        assert_eq!(loc.bucket, "book-files");
        assert_eq!(loc.path, "7/moby-dick.pdf");
    }

    #[test]
    fn resolve_public_url_extracts_bucket_and_path() {
        let loc = ObjectLocation::resolve(
            "https://proj.supabase.co/storage/v1/object/public/book-files/7/moby-dick.pdf",
            "fallback",
        );
        assert_eq!(loc.bucket, "book-files");
        assert_eq!(loc.path, "7/moby-dick.pdf");
    }

    #[test]
    fn resolve_public_url_strips_query_string() {
        let loc = ObjectLocation::resolve(
            "https://proj.supabase.co/storage/v1/object/public/book-files/7/a.pdf?download=1",
            "fallback",
        );
        assert_eq!(loc.path, "7/a.pdf");
    }

    #[test]
    fn resolve_unrecognized_url_falls_back_to_default_bucket() {
        let loc = ObjectLocation::resolve("https://example.com/some/file.pdf", "book-files");
        assert_eq!(loc.bucket, "book-files");
        assert_eq!(loc.path, "https://example.com/some/file.pdf");
    }

    #[test]
    fn text_sibling_replaces_extension() {
        let loc = ObjectLocation::resolve("7/moby-dick.pdf", "book-files");
        assert_eq!(loc.text_sibling(), "7/moby-dick.txt");
    }

    #[test]
    fn text_sibling_handles_missing_extension() {
        let loc = ObjectLocation::resolve("7/moby-dick", "book-files");
        assert_eq!(loc.text_sibling(), "7/moby-dick.txt");
    }

    #[test]
    fn text_sibling_ignores_dots_in_directories() {
        let loc = ObjectLocation::resolve("v1.2/books/moby.epub", "book-files");
        assert_eq!(loc.text_sibling(), "v1.2/books/moby.txt");
    }
}
