//! File system abstraction for testability.

use async_trait::async_trait;
use std::path::Path;

/// Abstraction over the file system operations the orchestrator performs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if a file exists at the given path.
    async fn file_exists(&self, path: &Path) -> bool;

    /// Creates all directories in the given path.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Renames a file, replacing the destination if it exists.
    async fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Removes a file.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Writes `contents` to `path`, creating parent directories as needed.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tokio_fs_file_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::File::create(&path).unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.file_exists(&path).await);
        assert!(!fs.file_exists(&dir.path().join("nonexistent.txt")).await);
        // Directories are not files
        assert!(!fs.file_exists(dir.path()).await);
    }

    #[tokio::test]
    async fn tokio_fs_create_dir_all_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");

        let fs = TokioFileSystem::new();
        fs.create_dir_all(&nested).await.unwrap();
        fs.create_dir_all(&nested).await.unwrap();
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn tokio_fs_rename_and_remove() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join(".item.part");
        let to = dir.path().join("001-item.mp4");
        std::fs::write(&from, b"data").unwrap();

        let fs = TokioFileSystem::new();
        fs.rename_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");

        fs.remove_file(&to).await.unwrap();
        assert!(!to.exists());
    }

    #[tokio::test]
    async fn tokio_fs_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captions/abc.en.manual.srt");

        let fs = TokioFileSystem::new();
        fs.write_file(&path, b"1\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n");
    }
}
