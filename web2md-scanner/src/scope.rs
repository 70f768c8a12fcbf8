use crate::error::{Result, ScanError};
use crate::media::MediaOptions;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_COUNT: usize = 999;
pub const DEFAULT_SCHEMES: &[&str] = &["http", "https"];
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    r"\.pdf$", r"\.zip$", r"\.rar$", r"\.7z$", r"\.tar$", r"\.gz$", r"\.exe$",
];

/// User-facing crawl settings, turned into a [`CrawlScope`] once the target is known.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub output_root: PathBuf,
    pub max_depth: usize,
    /// 0 means unbounded
    pub max_count: usize,
    pub allowed_schemes: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub media: MediaOptions,
    pub workers: usize,
    pub render_timeout: Duration,
}

impl CrawlConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_count: DEFAULT_MAX_COUNT,
            allowed_schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            media: MediaOptions::default(),
            workers: 1,
            render_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_count(mut self, count: usize) -> Self {
        self.max_count = count;
        self
    }

    pub fn with_media(mut self, media: MediaOptions) -> Self {
        self.media = media;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}

/// Immutable per-crawl policy. Every admissibility, depth and filename
/// decision is made relative to `base_url`, the parent directory of the target.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    base_url: Url,
    max_depth: usize,
    max_count: usize,
    output_root: PathBuf,
    allowed_schemes: Vec<String>,
    exclude: Vec<Regex>,
    media: MediaOptions,
}

impl CrawlScope {
    pub fn new(target: &Url, config: &CrawlConfig) -> Result<Self> {
        if target.host_str().is_none_or(str::is_empty) {
            return Err(ScanError::InvalidUrl(format!("{} has no host", target)));
        }

        let exclude = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            base_url: derive_base_url(target),
            max_depth: config.max_depth,
            max_count: config.max_count,
            output_root: config.output_root.clone(),
            allowed_schemes: config
                .allowed_schemes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            exclude,
            media: config.media,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn media(&self) -> MediaOptions {
        self.media
    }

    /// Number of non-empty path segments between the scope root and `url`.
    /// `None` when the URL lives on another authority or outside the root path.
    pub fn relative_depth(&self, url: &Url) -> Option<usize> {
        // authority only; http and https links to the same host share a scope
        if url.host_str() != self.base_url.host_str() || url.port() != self.base_url.port() {
            return None;
        }

        let base_path = slash_terminated(&decode_path(self.base_url.path()));
        let target_path = slash_terminated(&decode_path(url.path()));
        let rest = target_path.strip_prefix(&base_path)?;

        Some(
            rest.split('/')
                .filter(|segment| !segment.trim().is_empty())
                .count(),
        )
    }

    pub fn is_allowed_scheme(&self, url: &Url) -> bool {
        self.allowed_schemes.iter().any(|s| s == url.scheme())
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(url))
    }

    /// Static scope check: scheme, depth and exclude patterns.
    /// Dedup and count gating live on [`crate::session::CrawlSession`].
    pub fn admits(&self, url: &Url) -> bool {
        if !self.is_allowed_scheme(url) {
            return false;
        }
        match self.relative_depth(url) {
            Some(depth) if depth <= self.max_depth => {}
            _ => return false,
        }
        !self.is_excluded(url.as_str())
    }

    /// True once `saved` pages exhaust the configured budget.
    pub fn count_reached(&self, saved: usize) -> bool {
        self.max_count > 0 && saved >= self.max_count
    }
}

/// Parent directory of the target's path, always `/`-terminated.
/// `https://a.test/docs/home` and `https://a.test/docs/home/` both map to `https://a.test/docs/`.
pub fn derive_base_url(target: &Url) -> Url {
    let trimmed = target.path().trim_end_matches('/');
    let parent = match trimmed.rfind('/') {
        Some(idx) if !trimmed.is_empty() => &trimmed[..idx],
        _ => "",
    };

    let mut base = target.clone();
    base.set_path(&format!("{}/", parent.trim_end_matches('/')));
    base.set_query(None);
    base.set_fragment(None);
    base
}

/// Canonical form used as the dedup key: parsed by `url`, fragment removed.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

/// Resolve an in-document href against the document base URI.
/// Mail, phone, script and fragment-only targets yield `None`.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    base.join(href).ok()
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn slash_terminated(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}
