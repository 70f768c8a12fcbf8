pub mod content;
pub mod convert;
pub mod crawler;
pub mod error;
pub mod filename;
pub mod links;
pub mod media;
pub mod page;
pub mod render;
pub mod result;
pub mod scope;
pub mod session;

pub use crawler::{Crawler, ProgressCallback, ResultCallback};
pub use error::ScanError;
pub use media::{HttpMediaFetcher, MediaFetcher, MediaKind, MediaOptions};
pub use render::{HttpRenderer, RenderedPage, Renderer};
pub use result::{CrawlSummary, PageOutcome, PageResult, TaskState};
pub use scope::{CrawlConfig, CrawlScope};
pub use session::CrawlSession;

#[cfg(feature = "browser")]
pub use render::BrowserRenderer;
