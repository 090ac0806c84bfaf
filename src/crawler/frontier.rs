//! Level-synchronized BFS frontier
//!
//! The frontier tracks how many queued URLs remain in the current level and how
//! many were discovered for the next one. Depth advances only when the current
//! level is exhausted, so depth limits follow link distance from the start URL
//! rather than queue arrival order.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// FIFO queue of pages to crawl with per-level accounting
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
    current_level: usize,
    next_level: usize,
    depth: u32,
}

impl Frontier {
    /// Creates a frontier holding only the start URL at depth 0
    pub fn new(start: Url) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(start);
        Self {
            queue,
            visited: HashSet::new(),
            current_level: 1,
            next_level: 0,
            depth: 0,
        }
    }

    /// Depth of the level currently being processed
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Takes the next URL and consumes one slot of the current level
    ///
    /// Callers must call [`Frontier::finish_item`] once they are done with the
    /// URL, after any [`Frontier::push`] calls for links found on it.
    pub fn pop(&mut self) -> Option<Url> {
        let url = self.queue.pop_front()?;
        self.current_level = self.current_level.saturating_sub(1);
        Some(url)
    }

    /// Closes the level when its last URL has been handled
    pub fn finish_item(&mut self) {
        if self.current_level == 0 {
            self.depth += 1;
            self.current_level = self.next_level;
            self.next_level = 0;
            tracing::debug!(depth = self.depth, queued = self.queue.len(), "level complete");
        }
    }

    /// Marks a URL as visited; returns false if it already was
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Queues a URL for the next level
    pub fn push(&mut self, url: Url) {
        self.queue.push_back(url);
        self.next_level += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_depth_advances_per_level() {
        let mut frontier = Frontier::new(url("https://example.com/"));
        assert_eq!(frontier.depth(), 0);

        let start = frontier.pop().unwrap();
        assert!(frontier.mark_visited(&start));
        frontier.push(url("https://example.com/a"));
        frontier.push(url("https://example.com/b"));
        frontier.finish_item();
        assert_eq!(frontier.depth(), 1);

        let a = frontier.pop().unwrap();
        frontier.mark_visited(&a);
        frontier.push(url("https://example.com/c"));
        frontier.finish_item();
        assert_eq!(frontier.depth(), 1);

        let b = frontier.pop().unwrap();
        frontier.mark_visited(&b);
        frontier.finish_item();
        assert_eq!(frontier.depth(), 2);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_revisit_is_reported() {
        let mut frontier = Frontier::new(url("https://example.com/"));
        let start = frontier.pop().unwrap();
        assert!(frontier.mark_visited(&start));
        assert!(!frontier.mark_visited(&start));
        assert!(frontier.is_visited(&url("https://example.com/")));
    }

    #[test]
    fn test_skipped_duplicate_still_closes_level() {
        let mut frontier = Frontier::new(url("https://example.com/"));
        let start = frontier.pop().unwrap();
        frontier.mark_visited(&start);
        frontier.push(url("https://example.com/a"));
        frontier.push(url("https://example.com/a"));
        frontier.finish_item();

        let first = frontier.pop().unwrap();
        assert!(frontier.mark_visited(&first));
        frontier.finish_item();
        let dup = frontier.pop().unwrap();
        assert!(!frontier.mark_visited(&dup));
        frontier.finish_item();

        assert_eq!(frontier.depth(), 2);
        assert!(frontier.is_empty());
    }
}
