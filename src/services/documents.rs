use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// Where uploaded booking documents end up.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores the bytes and returns the public URL of the stored copy.
    async fn store(&self, extension: &str, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Lower-cased extension of an accepted document type.
pub fn allowed_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("pdf"),
        "jpg" => Some("jpg"),
        "jpeg" => Some("jpeg"),
        "png" => Some("png"),
        _ => None,
    }
}

pub struct LocalDocumentStore {
    root: PathBuf,
    base_url: String,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store(&self, extension: &str, bytes: &[u8]) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("failed to create upload directory")?;

        let name = format!("{}.{extension}", uuid::Uuid::new_v4());
        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))?;

        Ok(format!("{}/uploads/{name}", self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("aadhar.PDF"), Some("pdf"));
        assert_eq!(allowed_extension("photo.final.jpeg"), Some("jpeg"));
        assert_eq!(allowed_extension("script.sh"), None);
        assert_eq!(allowed_extension("noext"), None);
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("venuebook-test-{}", uuid::Uuid::new_v4()));
        let store = LocalDocumentStore::new(&dir, "http://localhost:5000/");

        let url = store.store("pdf", b"%PDF-1.4").await.unwrap();
        assert!(url.starts_with("http://localhost:5000/uploads/"));
        assert!(url.ends_with(".pdf"));

        let name = url.rsplit('/').next().unwrap();
        let written = std::fs::read(dir.join(name)).unwrap();
        assert_eq!(written, b"%PDF-1.4");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
