use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::storage::traits::PingLog;

/// In-memory ping log, used by tests to count attempts.
#[derive(Clone, Default)]
pub struct MemoryPingLog {
    lines: Arc<RwLock<Vec<String>>>,
}

impl MemoryPingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }
}

#[async_trait]
impl PingLog for MemoryPingLog {
    async fn append(&self, line: &str) -> Result<()> {
        self.lines.write().push(line.trim_end_matches('\n').to_string());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>> {
        Ok(self.lines.read().clone())
    }

    async fn clear(&self) -> Result<()> {
        self.lines.write().clear();
        Ok(())
    }
}

/// Plain-text ping log. Grows without bound until cleared.
#[derive(Debug, Clone)]
pub struct FilePingLog {
    path: PathBuf,
}

impl FilePingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PingLog for FilePingLog {
    async fn append(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut record = line.trim_end_matches('\n').to_string();
        record.push('\n');
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_log_append_and_clear() {
        let log = MemoryPingLog::new();
        log.append("first\n").await.unwrap();
        log.append("second").await.unwrap();

        assert_eq!(log.read_all().await.unwrap(), vec!["first", "second"]);

        log.clear().await.unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_file_log_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/ping.log");
        let log = FilePingLog::new(&path);

        log.append("2024-03-15 10:00:00 - one").await.unwrap();
        log.append("2024-03-15 11:00:00 - two").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2024-03-15 10:00:00 - one\n2024-03-15 11:00:00 - two\n");
        assert_eq!(log.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_file_log_clear_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let log = FilePingLog::new(temp_dir.path().join("ping.log"));

        log.clear().await.unwrap();
        assert!(log.read_all().await.unwrap().is_empty());

        log.append("line").await.unwrap();
        log.clear().await.unwrap();
        assert!(!log.path().exists());
    }
}
