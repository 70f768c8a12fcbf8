use crate::error::{Result, ScanError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use scraper::node::Element;
use scraper::{ElementRef, Selector};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".avi", ".mov", ".webm", ".flv", ".mkv", ".mpeg", ".mpg",
];

/// Lazy-load attributes win over `srcset`, which wins over `src`.
pub const IMAGE_ATTRS: &[&str] = &[
    "data-src",
    "data-original",
    "data-original-src",
    "file-src",
    "srcset",
    "src",
];
pub const VIDEO_ATTRS: &[&str] = &["src", "data-src"];
pub const SOURCE_ATTRS: &[&str] = &["src", "srcset"];

const HASH_LEN: usize = 8;
const MAX_CONCURRENT_DOWNLOADS: usize = 8;
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MediaOptions {
    pub images: bool,
    pub videos: bool,
}

impl MediaOptions {
    pub fn enabled(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.images,
            MediaKind::Video => self.videos,
        }
    }

    pub fn any(&self) -> bool {
        self.images || self.videos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }
}

/// A media element found in a page, keyed by its absolute source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub source_url: String,
    pub owner_page_path: PathBuf,
    pub kind: MediaKind,
}

/// Transport used to pull media bytes.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::render::DEFAULT_USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::MediaStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pick the best URL from `attrs`, in priority order. For `srcset` the last
/// candidate is taken and its width/density descriptor dropped.
pub fn best_candidate_url(element: &Element, attrs: &[&str]) -> Option<String> {
    for attr in attrs {
        let Some(value) = element.attr(attr).map(str::trim) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if *attr == "srcset" {
            let last = value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .last();
            if let Some(url) = last.and_then(|part| part.split_whitespace().next()) {
                return Some(url.to_string());
            }
            continue;
        }
        return Some(value.to_string());
    }
    None
}

/// Media reference for a single element, or `None` if the element is not
/// media or its kind is disabled. `base` resolves relative and
/// protocol-relative sources.
pub fn media_reference_for(
    element: &Element,
    base: &Url,
    options: MediaOptions,
) -> Option<(String, MediaKind)> {
    let (attrs, kind) = match element.name() {
        "img" if options.images => (IMAGE_ATTRS, Some(MediaKind::Image)),
        "video" if options.videos => (VIDEO_ATTRS, Some(MediaKind::Video)),
        // <source> is decided by extension, and only looked at when videos are on
        "source" if options.videos => (SOURCE_ATTRS, None),
        _ => return None,
    };

    let candidate = best_candidate_url(element, attrs)?;
    let absolute = base.join(&candidate).ok()?;

    let kind = match kind {
        Some(kind) => kind,
        None => {
            let ext = url_extension(&absolute);
            if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
                MediaKind::Video
            } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) && options.images {
                MediaKind::Image
            } else {
                return None;
            }
        }
    };

    Some((absolute.to_string(), kind))
}

/// Every media reference under `root`, in document order, deduplicated by URL.
pub fn collect_media(
    root: ElementRef,
    base: &Url,
    page_path: &Path,
    options: MediaOptions,
) -> Vec<MediaReference> {
    if !options.any() {
        return Vec::new();
    }

    let selector = Selector::parse("img, video, source").unwrap();
    let mut seen = std::collections::HashSet::new();
    root.select(&selector)
        .filter(|el| !crate::content::is_stripped(el))
        .filter_map(|el| media_reference_for(el.value(), base, options))
        .filter(|(url, _)| seen.insert(url.clone()))
        .map(|(source_url, kind)| MediaReference {
            source_url,
            owner_page_path: page_path.to_path_buf(),
            kind,
        })
        .collect()
}

/// Lowercased extension of the URL's decoded path, with its leading dot.
pub fn url_extension(url: &Url) -> String {
    let path = urlencoding::decode(url.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| url.path().to_string());
    let basename = path.rsplit('/').next().unwrap_or_default();
    Path::new(basename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn url_hash(url: &str) -> String {
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    digest[..HASH_LEN].to_string()
}

/// `<sanitized basename>_<hash of full URL><ext>`. Identical URLs always map
/// to the same name; different URLs sharing a basename do not collide.
pub fn media_filename(url: &Url, default_ext: &str) -> String {
    let raw = url.as_str();
    let hash = url_hash(raw);

    let path = urlencoding::decode(url.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| url.path().to_string());
    let basename = path.rsplit('/').next().unwrap_or_default();
    if basename.is_empty() {
        return format!("media_{}{}", hash, default_ext);
    }

    let as_path = Path::new(basename);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| default_ext.to_string());

    let safe = crate::filename::sanitize_component(&stem);
    if safe.is_empty() {
        format!("media_{}{}", hash, ext)
    } else {
        format!("{}_{}{}", safe, hash, ext)
    }
}

/// Where a media reference ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaResolution {
    /// Fetched during this call; holds the page-relative path
    Downloaded(String),
    /// Already on disk from an earlier page or run
    Cached(String),
    /// Left pointing at the source URL
    Remote(String),
}

impl MediaResolution {
    pub fn into_value(self) -> String {
        match self {
            MediaResolution::Downloaded(v)
            | MediaResolution::Cached(v)
            | MediaResolution::Remote(v) => v,
        }
    }
}

/// Persist one media reference next to its owning page.
///
/// Returns the path relative to the page (`images/<name>`), or the original
/// URL unchanged when the kind is disabled, the URL is not http(s), the
/// extension is not allowed, or the transfer fails.
pub async fn resolve_and_maybe_download(
    fetcher: &dyn MediaFetcher,
    candidate: &str,
    page_path: &Path,
    kind: MediaKind,
    options: MediaOptions,
) -> String {
    resolve_media(fetcher, candidate, page_path, kind, options)
        .await
        .into_value()
}

pub async fn resolve_media(
    fetcher: &dyn MediaFetcher,
    candidate: &str,
    page_path: &Path,
    kind: MediaKind,
    options: MediaOptions,
) -> MediaResolution {
    let remote = || MediaResolution::Remote(candidate.to_string());
    if !options.enabled(kind) || candidate.is_empty() {
        return remote();
    }
    let Ok(url) = Url::parse(candidate) else {
        return remote();
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return remote();
    }

    let ext = url_extension(&url);
    if !kind.allowed_extensions().contains(&ext.as_str()) {
        debug!(url = %url, ext = %ext, "Media extension not allowed");
        return remote();
    }

    let Some(page_dir) = page_path.parent() else {
        return remote();
    };
    let media_dir = page_dir.join(kind.dir_name());
    let filename = media_filename(&url, &ext);
    let save_path = media_dir.join(&filename);
    let relative = format!("{}/{}", kind.dir_name(), filename);

    let cached = tokio::fs::metadata(&save_path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if cached {
        debug!(path = %save_path.display(), "Media already on disk");
        return MediaResolution::Cached(relative);
    }

    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %url, error = %e, "Media download failed, keeping remote URL");
            return remote();
        }
    };

    match store_atomically(&media_dir, &save_path, &bytes).await {
        Ok(()) => {
            info!(url = %url, path = %save_path.display(), "Saved {:?}", kind);
            MediaResolution::Downloaded(relative)
        }
        Err(e) => {
            warn!(path = %save_path.display(), error = %e, "Failed to store media");
            remote()
        }
    }
}

/// Write to `<name>.part` and rename into place, so `save_path` only ever
/// holds complete files. The partial file is removed on failure.
async fn store_atomically(media_dir: &Path, save_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(media_dir).await?;

    let mut partial = save_path.as_os_str().to_os_string();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    let written = async {
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, save_path).await
    }
    .await;

    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}

/// Resolved media for one page.
#[derive(Debug, Default)]
pub struct MediaDownloads {
    /// Source URL -> value to write back into the document
    pub map: HashMap<String, String>,
    /// Files fetched for this page; cache hits are not counted
    pub downloaded: usize,
}

/// Resolve every reference concurrently.
pub async fn download_all(
    fetcher: &dyn MediaFetcher,
    references: &[MediaReference],
    options: MediaOptions,
) -> MediaDownloads {
    let pending: Vec<_> = references
        .iter()
        .map(|r| async move {
            let resolved =
                resolve_media(fetcher, &r.source_url, &r.owner_page_path, r.kind, options).await;
            (r.source_url.clone(), resolved)
        })
        .collect();

    let resolved: Vec<(String, MediaResolution)> = futures::stream::iter(pending)
        .buffer_unordered(MAX_CONCURRENT_DOWNLOADS)
        .collect()
        .await;

    let mut downloads = MediaDownloads::default();
    for (source, resolution) in resolved {
        if matches!(resolution, MediaResolution::Downloaded(_)) {
            downloads.downloaded += 1;
        }
        downloads.map.insert(source, resolution.into_value());
    }
    downloads
}
