//! Output module
//!
//! This module handles:
//! - The append-only JSONL record log
//! - The end-of-run crawl summary
//! - Page store statistics for the `--stats` mode

mod jsonl;
#[cfg(test)]
pub(crate) mod memory;
pub mod stats;
mod traits;

pub use jsonl::JsonlWriter;
pub use stats::{load_statistics, print_statistics, print_summary, StoreStatistics};
pub use traits::{CrawlSummary, OutputError, OutputResult, RecordWriter};
