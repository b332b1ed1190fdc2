//! In-memory record writer for tests

use crate::crawler::ScrapeRecord;
use crate::output::{OutputError, OutputResult, RecordWriter};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MemoryWriter {
    records: Mutex<Vec<ScrapeRecord>>,
    fail: bool,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer whose every write fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<ScrapeRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl RecordWriter for MemoryWriter {
    async fn write(&self, record: &ScrapeRecord) -> OutputResult<()> {
        if self.fail {
            return Err(OutputError::Write("writer unavailable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
