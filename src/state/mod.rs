//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WorkerState`: Where a fetch worker is in its per-item cycle
//! - `DomainState`: Per-domain request spacing bookkeeping

mod domain_state;
mod worker_state;

// Re-export main types
pub use domain_state::DomainState;
pub use worker_state::WorkerState;
