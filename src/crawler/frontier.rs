//! URL frontier
//!
//! A FIFO work queue shared by every worker. Each popped work item must be
//! matched by exactly one `task_done`; `join` waits until the outstanding
//! counter returns to zero. Shutdown is delivered as one `Stop` item per
//! worker.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{watch, Semaphore};
use url::Url;

/// A URL to visit and its distance from the seeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

/// An entry in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierItem {
    Work(CrawlTask),
    /// Sentinel: the worker that pops this exits
    Stop,
}

/// The pending-work queue
pub struct Frontier {
    queue: Mutex<VecDeque<FrontierItem>>,
    available: Semaphore,
    outstanding: watch::Sender<usize>,
}

impl Frontier {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
            outstanding,
        }
    }

    /// Enqueues an item; work items count towards the outstanding total
    pub fn push(&self, item: FrontierItem) {
        if matches!(item, FrontierItem::Work(_)) {
            self.outstanding.send_modify(|n| *n += 1);
        }
        self.lock().push_back(item);
        self.available.add_permits(1);
    }

    /// Enqueues a URL at the given depth
    pub fn push_url(&self, url: Url, depth: u32) {
        self.push(FrontierItem::Work(CrawlTask { url, depth }));
    }

    /// Waits for the next item
    pub async fn pop(&self) -> FrontierItem {
        loop {
            match self.available.acquire().await {
                Ok(permit) => permit.forget(),
                // The semaphore is never closed; treat it as shutdown anyway
                Err(_) => return FrontierItem::Stop,
            }
            if let Some(item) = self.lock().pop_front() {
                return item;
            }
        }
    }

    /// Marks one popped work item as finished
    pub fn task_done(&self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Guard that calls [`Frontier::task_done`] when dropped
    ///
    /// Holding one for the duration of an item guarantees the item is marked
    /// done on every exit path, panics included.
    pub fn done_guard(&self) -> DoneGuard<'_> {
        DoneGuard { frontier: self }
    }

    /// Waits until every pushed work item has been marked done
    pub async fn join(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Pushes exactly `workers` shutdown sentinels
    pub fn close(&self, workers: usize) {
        for _ in 0..workers {
            self.push(FrontierItem::Stop);
        }
    }

    /// Work items pushed but not yet marked done
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Items currently waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FrontierItem>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a frontier item done on drop
pub struct DoneGuard<'a> {
    frontier: &'a Frontier,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}
