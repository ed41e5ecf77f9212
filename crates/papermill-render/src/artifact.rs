//! Rendered-artifact persistence seam.
//!
//! The core produces a document and hands it off; where it lands is an
//! external concern. The local filesystem store mirrors the
//! `{root}/{tenant}/{document_number}.pdf` layout of upstream
//! deployments.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use papermill_core::result::AppResult;

/// Persists rendered documents and returns an artifact reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync + std::fmt::Debug {
    /// Store the document bytes, returning a reference usable in job
    /// results and downstream links.
    async fn store(
        &self,
        tenant_id: &str,
        document_number: &str,
        bytes: &[u8],
    ) -> AppResult<String>;
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    /// Root directory for all artifacts.
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(
        &self,
        tenant_id: &str,
        document_number: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        // Document numbers are caller-supplied; keep them out of path
        // traversal territory.
        let safe_number: String = document_number
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        let dir = self.root.join(tenant_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{safe_number}.pdf"));
        tokio::fs::write(&path, bytes).await?;

        let reference = format!("{tenant_id}/{safe_number}.pdf");
        debug!(artifact = %reference, size = bytes.len(), "Stored rendered artifact");
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("papermill-test-{}", uuid_suffix()));
        let store = LocalArtifactStore::new(&dir);

        let reference = store.store("t1", "INV-001", b"%PDF").await.unwrap();
        assert_eq!(reference, "t1/INV-001.pdf");

        let written = tokio::fs::read(dir.join("t1/INV-001.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_sanitizes_document_number() {
        let dir = std::env::temp_dir().join(format!("papermill-test-{}", uuid_suffix()));
        let store = LocalArtifactStore::new(&dir);

        let reference = store.store("t1", "../../etc/passwd", b"x").await.unwrap();
        assert_eq!(reference, "t1/______etc_passwd.pdf");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    fn uuid_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }
}
