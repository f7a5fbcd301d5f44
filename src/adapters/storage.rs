use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(!storage.exists("reports/run.json").await);
        storage.write_file("reports/run.json", b"{}").await.unwrap();
        assert!(storage.exists("reports/run.json").await);
        assert_eq!(storage.read_file("reports/run.json").await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let err = storage.read_file("missing.csv").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::ListingError::IoError(_)));
    }
}
