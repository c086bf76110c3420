use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use chrono::Utc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::Secrets;
use crate::errors::ScanError;

const RECENT_LINES: usize = 500;

/// Human-readable, append-only log of one scan. Lines look like
/// `[HH:MM:SS] message`; configured secrets never reach the file.
pub struct ActivityLog {
    path: PathBuf,
    secrets: Secrets,
    file: Mutex<File>,
    recent: StdMutex<VecDeque<String>>,
}

impl ActivityLog {
    pub async fn create(path: &Path, title: &str, secrets: Secrets) -> Result<Self, ScanError> {
        let header = format!("# {}\n# Started: {}\n\n", title, Utc::now().to_rfc3339());
        tokio::fs::write(path, &header).await?;
        let file = tokio::fs::OpenOptions::new().append(true).open(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            secrets,
            file: Mutex::new(file),
            recent: StdMutex::new(VecDeque::with_capacity(RECENT_LINES)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets.redact(text)
    }

    pub async fn append(&self, message: &str) -> Result<(), ScanError> {
        let line = format!("[{}] {}", Utc::now().format("%H:%M:%S"), self.redact(message));

        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_LINES {
                recent.pop_front();
            }
            recent.push_back(line.clone());
        }

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    /// Last `n` lines written by this process, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        match self.recent.lock() {
            Ok(recent) => {
                let skip = recent.len().saturating_sub(n);
                recent.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }
}

/// Last `n` entry lines of an activity log on disk, skipping the header.
pub async fn read_tail(path: &Path, n: usize) -> Result<Vec<String>, ScanError> {
    let content = tokio::fs::read_to_string(path).await?;
    let lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_redacts_and_tails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.log");
        let log = ActivityLog::create(&path, "Scan s-1", Secrets::default().with_password("hunter22"))
            .await
            .unwrap();

        log.append("Login with admin / hunter22").await.unwrap();
        log.append("Crawl started").await.unwrap();
        log.append("Crawl finished").await.unwrap();

        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert!(tail[0].ends_with("Crawl started"));

        let on_disk = read_tail(&path, 10).await.unwrap();
        assert_eq!(on_disk.len(), 3);
        assert!(!on_disk[0].contains("hunter22"));
        assert!(on_disk[0].starts_with('['));
    }

    #[tokio::test]
    async fn test_tail_larger_than_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::create(&dir.path().join("a.log"), "t", Secrets::default())
            .await
            .unwrap();
        log.append("only line").await.unwrap();
        assert_eq!(log.tail(50).len(), 1);
    }

    #[tokio::test]
    async fn test_read_tail_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_tail(&dir.path().join("nope.log"), 5).await;
        assert!(matches!(result, Err(ScanError::Io(_))));
    }
}
