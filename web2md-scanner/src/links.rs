use crate::filename::{map_url_to_path, relative_link};
use crate::scope::{CrawlScope, normalize_url, resolve_href};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Every anchor target in the rendered document, resolved against the
/// document base URI, fragment removed, sorted and deduplicated.
pub fn extract_links(document: &Html, base_uri: &Url) -> Vec<Url> {
    let selector = Selector::parse("a[href]").unwrap();
    let links: BTreeSet<Url> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_href(base_uri, href))
        .map(|url| normalize_url(&url))
        .collect();
    links.into_iter().collect()
}

/// Local relative target for an anchor, or `None` to leave it as authored.
///
/// Only targets inside the crawl scope are rewritten; mail/tel/script and
/// fragment-only hrefs, other hosts and excluded or too-deep URLs are kept.
pub fn rewrite_target(
    href: &str,
    base_uri: &Url,
    current_page: &Path,
    scope: &CrawlScope,
) -> Option<String> {
    let target = normalize_url(&resolve_href(base_uri, href)?);
    if !scope.admits(&target) {
        return None;
    }

    let target_path = map_url_to_path(&target, scope);
    let from_dir = current_page.parent().unwrap_or(scope.output_root());
    let link = relative_link(from_dir, &target_path);
    debug!(href, rewritten = %link, "Rewrote in-scope link");
    Some(link)
}
