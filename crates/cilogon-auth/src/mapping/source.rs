//! Where mapping file contents and modification times come from.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

/// A mapping file, or anything that behaves like one.
#[async_trait]
pub trait MappingSource: Send + Sync {
    /// Human-readable location, used in errors and logs.
    fn location(&self) -> String;

    /// Current modification time.
    async fn modified(&self) -> io::Result<SystemTime>;

    /// Full contents.
    async fn read(&self) -> io::Result<String>;
}

/// A mapping file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileMappingSource {
    path: PathBuf,
}

impl FileMappingSource {
    /// Creates a source for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the mapping file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MappingSource for FileMappingSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn modified(&self) -> io::Result<SystemTime> {
        tokio::fs::metadata(&self.path).await?.modified()
    }

    async fn read(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_reads_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapfile");
        std::fs::write(&path, "alice local1\n").unwrap();

        let source = FileMappingSource::new(&path);
        assert_eq!(source.path(), path.as_path());
        assert_eq!(source.read().await.unwrap(), "alice local1\n");
        assert!(source.modified().await.is_ok());
        assert!(source.location().ends_with("mapfile"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileMappingSource::new(dir.path().join("absent"));
        let err = source.modified().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
