// Per-page extraction. `scraper::Html` is not `Send`, so the document is
// parsed inside each synchronous step and never held across an await.

use crate::content::{AttrOverride, select_content, serialize_fragment};
use crate::links::{extract_links, rewrite_target};
use crate::media::{MediaOptions, MediaReference, collect_media, media_reference_for};
use crate::scope::CrawlScope;
use scraper::Html;
use scraper::node::Element;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use url::Url;

/// What a rendered page offers before anything is written.
#[derive(Debug, Default)]
pub struct PagePlan {
    /// All anchor targets of the full document, sorted
    pub links: Vec<Url>,
    /// Media inside the selected content subtree
    pub media: Vec<MediaReference>,
    /// Content rule that matched, `None` if the document has no body
    pub content_rule: Option<&'static str>,
}

pub fn plan_page(html: &str, base_uri: &Url, page_path: &Path, media: MediaOptions) -> PagePlan {
    let document = Html::parse_document(html);
    let links = extract_links(&document, base_uri);

    let Some((content, rule)) = select_content(&document) else {
        return PagePlan {
            links,
            ..PagePlan::default()
        };
    };
    debug!(rule, "Content selected");

    PagePlan {
        links,
        media: collect_media(content, base_uri, page_path, media),
        content_rule: Some(rule),
    }
}

/// Serialize the content subtree with anchors pointing at local files and
/// media pointing at downloaded copies (or their absolute remote URL).
pub fn build_fragment(
    html: &str,
    base_uri: &Url,
    page_path: &Path,
    scope: &CrawlScope,
    media_map: &HashMap<String, String>,
) -> Option<String> {
    let document = Html::parse_document(html);
    let (content, _) = select_content(&document)?;
    let media = scope.media();

    let rewrite = |element: &Element| -> AttrOverride {
        if element.name() == "a" {
            let href = element.attr("href")?;
            return rewrite_target(href, base_uri, page_path, scope).map(|link| ("href", link));
        }
        let (source, _) = media_reference_for(element, base_uri, media)?;
        let value = media_map.get(&source).cloned().unwrap_or(source);
        Some(("src", value))
    };

    Some(serialize_fragment(content, &rewrite))
}
