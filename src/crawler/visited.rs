//! In-run visited set

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// URLs claimed by a worker during this run
///
/// `insert` is a single check-and-insert, so two workers can never both
/// claim the same URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url`; returns false if it was already claimed
    pub fn insert(&self, url: &Url) -> bool {
        self.lock().insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.lock().contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_once() {
        let visited = VisitedSet::new();
        let url = Url::parse("https://example.com/a").unwrap();

        assert!(!visited.contains(&url));
        assert!(visited.insert(&url));
        assert!(!visited.insert(&url));
        assert!(visited.contains(&url));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let url = Url::parse("https://example.com/contended").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                let url = url.clone();
                std::thread::spawn(move || visited.insert(&url))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
