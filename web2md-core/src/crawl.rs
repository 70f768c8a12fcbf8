use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::info;
use url::Url;
use web2md_scanner::error::{Result, ScanError};
use web2md_scanner::scope::derive_base_url;
use web2md_scanner::{
    CrawlConfig, CrawlSummary, Crawler, HttpMediaFetcher, HttpRenderer, MediaOptions, PageResult,
    Renderer,
};

/// Directory name used when the scope root yields nothing usable
pub const FALLBACK_OUTPUT_DIR: &str = "web2md_docs";

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-]").unwrap());
static REPEATED_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// How pages are turned into HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Plain HTTP fetch, no JavaScript
    Http,
    /// Headless Chromium, needs the `browser` feature
    Browser,
}

impl RendererKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(RendererKind::Http),
            "browser" | "chrome" | "chromium" => Some(RendererKind::Browser),
            _ => None,
        }
    }
}

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub target: Url,
    pub output_dir: PathBuf,
    pub max_depth: usize,
    pub max_count: usize,
    pub media: MediaOptions,
    pub workers: usize,
    pub exclude_patterns: Vec<String>,
    pub renderer: RendererKind,
    pub render_timeout: Duration,
    pub media_timeout: Duration,
    /// Extra wait after navigation before the DOM is read (browser only)
    pub settle: Duration,
    pub accept_invalid_certs: bool,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(target: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            output_dir: output_dir.into(),
            max_depth: web2md_scanner::scope::DEFAULT_MAX_DEPTH,
            max_count: web2md_scanner::scope::DEFAULT_MAX_COUNT,
            media: MediaOptions::default(),
            workers: 1,
            exclude_patterns: Vec::new(),
            renderer: RendererKind::Http,
            render_timeout: Duration::from_secs(60),
            media_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            accept_invalid_certs: true,
            show_progress_bars: false,
        }
    }

    /// Scanner configuration equivalent to these options.
    pub fn crawl_config(&self) -> CrawlConfig {
        self.exclude_patterns.iter().fold(
            CrawlConfig::new(&self.output_dir)
                .with_max_depth(self.max_depth)
                .with_max_count(self.max_count)
                .with_media(self.media)
                .with_workers(self.workers)
                .with_render_timeout(self.render_timeout),
            |config, pattern| config.with_exclude_pattern(pattern.clone()),
        )
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for reporting individual page results as they come in
pub type CrawlResultCallback = Arc<dyn Fn(PageResult) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Default output directory for a target: `<host>_<scope path>`, with
/// anything that is not a word character or `-` replaced by `_`.
pub fn derive_output_dir(target: &Url) -> String {
    let base = derive_base_url(target);
    let authority = match (base.host_str(), base.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    let path = base.path().trim_matches('/').replace('/', "_");

    let name = format!("{}_{}", authority, path);
    let name = NON_WORD.replace_all(&name, "_");
    let name = REPEATED_UNDERSCORE.replace_all(&name, "_");
    let name = name.trim_matches('_');

    if name.is_empty() {
        FALLBACK_OUTPUT_DIR.to_string()
    } else {
        name.to_string()
    }
}

async fn build_renderer(options: &CrawlOptions) -> Result<Arc<dyn Renderer>> {
    match options.renderer {
        RendererKind::Http => {
            let scope_root = derive_base_url(&options.target);
            let renderer = HttpRenderer::new(options.render_timeout, options.accept_invalid_certs)?
                .with_referer(&scope_root);
            Ok(Arc::new(renderer))
        }
        #[cfg(feature = "browser")]
        RendererKind::Browser => {
            let renderer = web2md_scanner::BrowserRenderer::launch(
                options.settle,
                options.accept_invalid_certs,
            )
            .await?;
            Ok(Arc::new(renderer))
        }
        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => Err(ScanError::Other(
            "browser rendering requires building with the `browser` feature".to_string(),
        )),
    }
}

/// Execute a crawl with the given options
/// Returns the crawl summary
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    result_callback: Option<CrawlResultCallback>,
) -> Result<CrawlSummary> {
    let renderer = build_renderer(&options).await?;
    let fetcher = Arc::new(HttpMediaFetcher::new(
        options.media_timeout,
        options.accept_invalid_certs,
    )?);

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| ScanError::Other(e.to_string()))?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    // Counter for tracking processed pages
    let processed_count = Arc::new(AtomicUsize::new(0));

    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let user_progress = progress_callback;
    let internal_progress_callback: web2md_scanner::ProgressCallback =
        Arc::new(move |_worker_id: usize, url: String| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!(
                    "Crawling... {} pages | {}",
                    count,
                    extract_url_path(&url)
                ));
            }
            if let Some(ref callback) = user_progress {
                callback(url);
            }
        });

    let mut crawler = Crawler::new(options.crawl_config(), renderer, fetcher)
        .with_progress_callback(internal_progress_callback);

    if let Some(cb) = result_callback {
        let pb_clone = progress_bar.clone();
        let result_cb: web2md_scanner::ResultCallback = Arc::new(move |result: PageResult| {
            match pb_clone {
                Some(ref pb) => pb.suspend(|| cb(result)),
                None => cb(result),
            }
        });
        crawler = crawler.with_result_callback(result_cb);
    }

    info!(target = %options.target, output = %options.output_dir.display(), "Crawl starting");
    let outcome = crawler.crawl(&options.target).await;

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        match outcome {
            Ok(ref summary) => pb.finish_with_message(format!(
                "Crawl complete! {} pages processed, {} saved",
                total, summary.saved
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_config_carries_options() {
        let mut options = CrawlOptions::new(
            Url::parse("https://x.test/docs/home").unwrap(),
            "/tmp/out",
        );
        options.max_depth = 2;
        options.max_count = 7;
        options.workers = 0;
        options.exclude_patterns = vec![r"/private/".to_string()];

        let config = options.crawl_config();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.max_count, 7);
        assert_eq!(config.workers, 1);
        assert!(config.exclude_patterns.contains(&r"/private/".to_string()));
        assert!(config.exclude_patterns.contains(&r"\.pdf$".to_string()));
    }

    #[test]
    fn test_renderer_kind_from_str() {
        assert_eq!(RendererKind::from_str("HTTP"), Some(RendererKind::Http));
        assert_eq!(RendererKind::from_str("browser"), Some(RendererKind::Browser));
        assert_eq!(RendererKind::from_str("lynx"), None);
    }
}
