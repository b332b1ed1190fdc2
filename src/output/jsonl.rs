//! JSON Lines record writer

use crate::crawler::ScrapeRecord;
use crate::output::traits::{OutputResult, RecordWriter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per line to a file
///
/// Writes are serialized through an async mutex and synced to disk before
/// `write` returns.
pub struct JsonlWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlWriter {
    /// Opens `path` for appending, creating it and its parent directories
    pub async fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordWriter for JsonlWriter {
    async fn write(&self, record: &ScrapeRecord) -> OutputResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}
