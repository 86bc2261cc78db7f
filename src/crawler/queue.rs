//! Single-pass URL queue
//!
//! URLs are delivered in insertion order. Draining the queue is destructive:
//! every pulled URL is removed, and once the queue has reported that it is
//! empty it stays exhausted for good.

use std::collections::VecDeque;
use std::iter::FusedIterator;

/// Order-preserving queue of URLs that is drained exactly once
#[derive(Debug, Default, Clone)]
pub struct UrlQueue {
    urls: VecDeque<String>,
    exhausted: bool,
}

impl UrlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one URL to the back of the queue
    ///
    /// URLs pushed after the queue was exhausted are dropped.
    pub fn push(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.exhausted {
            tracing::debug!("Dropping {} pushed to an exhausted queue", url);
            return;
        }
        self.urls.push_back(url);
    }

    /// Appends all URLs, preserving their order
    pub fn extend<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            self.push(url);
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    /// Pulls up to `size` URLs from the front of the queue
    ///
    /// Returns an empty batch once the queue is drained.
    pub fn next_batch(&mut self, size: usize) -> Vec<String> {
        self.by_ref().take(size).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for UrlQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

impl Iterator for UrlQueue {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let next = self.urls.pop_front();
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.urls.len(), Some(self.urls.len()))
    }
}

impl FusedIterator for UrlQueue {}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_URLS: [&str; 2] = ["https://www.python.org/", "https://xkcd.com/"];

    #[test]
    fn test_new_queue_is_empty() {
        let queue = UrlQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(!queue.is_exhausted());
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut queue = UrlQueue::new();
        queue.extend(TEST_URLS);
        queue.push("https://code-specialist.com");

        assert_eq!(queue.len(), 3);
        let drained: Vec<_> = queue.collect();
        assert_eq!(
            drained,
            vec![
                "https://www.python.org/",
                "https://xkcd.com/",
                "https://code-specialist.com"
            ]
        );
    }

    #[test]
    fn test_pull_removes_head() {
        let mut queue: UrlQueue = TEST_URLS.into_iter().collect();

        assert_eq!(queue.next().as_deref(), Some("https://www.python.org/"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next().as_deref(), Some("https://xkcd.com/"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut queue: UrlQueue = TEST_URLS.into_iter().collect();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_exhausted_queue_stays_exhausted() {
        let mut queue: UrlQueue = TEST_URLS.into_iter().collect();
        assert_eq!(queue.by_ref().count(), 2);
        assert!(queue.is_exhausted());

        queue.push("https://code-specialist.com");
        assert!(queue.is_empty());
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_next_batch() {
        let urls: Vec<String> = (0..7).map(|i| format!("https://example.com/{}", i)).collect();
        let mut queue: UrlQueue = urls.clone().into_iter().collect();

        let mut batches = Vec::new();
        loop {
            let batch = queue.next_batch(3);
            if batch.is_empty() {
                break;
            }
            batches.push(batch);
        }

        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![3, 3, 1]
        );
        assert_eq!(batches.concat(), urls);
    }
}
