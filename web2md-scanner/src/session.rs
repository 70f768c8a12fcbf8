use crate::scope::{CrawlScope, normalize_url};
use std::collections::HashSet;
use url::Url;

/// Mutable bookkeeping for one crawl. Owned by the traversal engine; the
/// visited set and the saved counter are never touched from anywhere else.
#[derive(Debug, Default)]
pub struct CrawlSession {
    visited: HashSet<String>,
    saved_count: usize,
    // saves granted but not yet written, so concurrent workers cannot overshoot max_count
    reserved: usize,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_count(&self) -> usize {
        self.saved_count
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(normalize_url(url).as_str())
    }

    pub fn count_reached(&self, scope: &CrawlScope) -> bool {
        scope.count_reached(self.saved_count)
    }

    /// Full admissibility: scheme, depth, exclude patterns, dedup and page budget.
    pub fn is_admissible(&self, url: &Url, scope: &CrawlScope) -> bool {
        !self.count_reached(scope) && !self.is_visited(url) && scope.admits(url)
    }

    /// Check admissibility and mark the URL visited in one step.
    /// Returns the URL's relative depth when it may be dispatched.
    pub fn try_dispatch(&mut self, url: &Url, scope: &CrawlScope) -> Option<usize> {
        if !self.is_admissible(url, scope) {
            return None;
        }
        let depth = scope.relative_depth(url)?;
        self.visited.insert(normalize_url(url).to_string());
        Some(depth)
    }

    /// Claim one slot of the page budget before writing.
    pub fn reserve_save(&mut self, scope: &CrawlScope) -> bool {
        if scope.count_reached(self.saved_count + self.reserved) {
            return false;
        }
        self.reserved += 1;
        true
    }

    pub fn commit_save(&mut self) {
        self.reserved = self.reserved.saturating_sub(1);
        self.saved_count += 1;
    }

    pub fn release_save(&mut self) {
        self.reserved = self.reserved.saturating_sub(1);
    }
}
