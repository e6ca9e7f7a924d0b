use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use quill_core::ports::{MediaError, MediaStorage};

/// Writes uploads under a media root as `<dir>/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    /// Storage rooted at `root`, created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Absolute location of a stored path. Absolute paths and `..` are refused.
    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaError::InvalidPath(stored_path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let stored_path = format!("{dir}/{}.{extension}", Uuid::new_v4());
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, bytes).await?;

        tracing::debug!(path = %stored_path, size = bytes.len(), "Upload stored");
        Ok(stored_path)
    }

    /// Missing files count as removed.
    async fn remove(&self, path: &str) -> Result<(), MediaError> {
        let absolute = self.resolve(path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path()).unwrap();

        let path = storage.store("posts", "gif", b"GIF89a").await.unwrap();
        assert!(path.starts_with("posts/"));
        assert!(path.ends_with(".gif"));

        let absolute = storage.resolve(&path).unwrap();
        assert_eq!(std::fs::read(&absolute).unwrap(), b"GIF89a");

        storage.remove(&path).await.unwrap();
        assert!(!absolute.exists());
        storage.remove(&path).await.unwrap();
    }

    #[test]
    fn test_resolve_refuses_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path()).unwrap();

        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert!(storage.resolve("posts/a.png").is_ok());
    }
}
