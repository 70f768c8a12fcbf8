use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of a single page inside the traversal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Fetching,
    Extracting,
    Saving,
    Saved,
    SkippedEmpty,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Saved | TaskState::SkippedEmpty | TaskState::Failed
        )
    }
}

/// How a dispatched page ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    Saved,
    /// No content survived selection or conversion
    SkippedEmpty,
    /// Page budget was exhausted before this page could be written
    SkippedLimit,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: Option<String>,
    pub depth: usize,
    pub outcome: PageOutcome,
    pub output_path: Option<PathBuf>,
    pub links_found: Vec<String>,
    pub media_saved: usize,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            final_url: None,
            depth,
            outcome: PageOutcome::Failed,
            output_path: None,
            links_found: Vec::new(),
            media_saved: 0,
            elapsed: Duration::from_secs(0),
            error: None,
        }
    }

    pub fn with_error(url: String, depth: usize, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url, depth)
        }
    }

    pub fn is_saved(&self) -> bool {
        self.outcome == PageOutcome::Saved
    }
}

/// Everything a finished crawl reports back to the front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub target: String,
    pub base_url: String,
    pub output_root: PathBuf,
    pub saved: usize,
    pub pages: Vec<PageResult>,
}

impl CrawlSummary {
    pub fn count(&self, outcome: PageOutcome) -> usize {
        self.pages.iter().filter(|p| p.outcome == outcome).count()
    }

    pub fn media_saved(&self) -> usize {
        self.pages.iter().map(|p| p.media_saved).sum()
    }
}
