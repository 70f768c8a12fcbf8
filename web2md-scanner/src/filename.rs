// URL -> local file mapping. Pure: same URL and scope always give the same path.

use crate::scope::CrawlScope;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

pub const INDEX_NAME: &str = "index";
pub const DOCUMENT_EXTENSION: &str = "md";

static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());
static REPEATED_JOINER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Replace filesystem-illegal characters with `_`, collapse runs and trim.
pub fn sanitize_component(name: &str) -> String {
    let replaced = ILLEGAL_CHARS.replace_all(name, "_");
    let collapsed = REPEATED_JOINER.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// File name (no directory) for a crawled page.
///
/// `https://x.test/docs/home/sub` under `https://x.test/docs/` becomes
/// `home_sub.md`; the scope root itself becomes `index.md`. URLs outside
/// the root fall back to their last path segment.
pub fn url_to_filename(url: &Url, base: &Url) -> String {
    let mut url = url.clone();
    if url.scheme() != base.scheme()
        && url.host_str() == base.host_str()
        && url.port() == base.port()
    {
        // same authority, so the page maps as if it used the root's scheme
        let _ = url.set_scheme(base.scheme());
    }
    let url_lower = url.as_str().to_lowercase();
    let base_lower = base.as_str().to_lowercase();

    let name_part = if url_lower.trim_end_matches('/') == base_lower.trim_end_matches('/') {
        String::new()
    } else if let Some(rest) = url_lower.strip_prefix(&base_lower) {
        rest.trim_end_matches('/').to_string()
    } else {
        url.path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .last()
            .unwrap_or("unknown")
            .to_lowercase()
    };

    let safe = sanitize_component(&name_part.replace('/', "_"));
    if safe.is_empty() {
        format!("{}.{}", INDEX_NAME, DOCUMENT_EXTENSION)
    } else {
        format!("{}.{}", safe, DOCUMENT_EXTENSION)
    }
}

/// Absolute output path for a page. Always lexically inside the output root:
/// anything that would escape is reduced to the bare file name under the root.
pub fn map_url_to_path(url: &Url, scope: &CrawlScope) -> PathBuf {
    let root = normalize_lexically(scope.output_root());
    let filename = url_to_filename(url, scope.base_url());
    let candidate = normalize_lexically(&root.join(&filename));

    if candidate.starts_with(&root) && candidate != root {
        return candidate;
    }

    let bare = Path::new(&filename)
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| format!("{}.{}", INDEX_NAME, DOCUMENT_EXTENSION).into());
    root.join(bare)
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Relative link (always `/`-separated) from directory `from_dir` to file `to`.
pub fn relative_link(from_dir: &Path, to: &Path) -> String {
    let from_buf = normalize_lexically(from_dir);
    let to_buf = normalize_lexically(to);
    let from: Vec<Component> = from_buf.components().collect();
    let target: Vec<Component> = to_buf.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat_n("..".to_string(), from.len() - common));
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
