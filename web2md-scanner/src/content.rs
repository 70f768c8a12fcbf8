// Main-content selection and fragment serialization.

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::fmt::Write;

/// Elements dropped together with their whole subtree.
pub const STRIP_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "iframe", "sidebar",
];

/// Structural rules tried in order; the first non-empty match wins.
pub const CONTENT_RULES: &[&str] = &[
    "main",
    "div.article-content",
    "div.article_content",
    "div#main-content",
    "div.content",
    "article",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Attribute override produced by a rewrite pass: `(name, value)`.
pub type AttrOverride = Option<(&'static str, String)>;

pub fn is_strip_tag(name: &str) -> bool {
    STRIP_TAGS.contains(&name)
}

/// True if the element or any of its ancestors is a stripped tag.
pub fn is_stripped(element: &ElementRef) -> bool {
    if is_strip_tag(element.value().name()) {
        return true;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_strip_tag(ancestor.value().name()))
}

fn has_content(element: &ElementRef) -> bool {
    let has_text = element.descendants().any(|node| {
        node.value().as_text().is_some_and(|t| !t.trim().is_empty())
            && node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| !is_stripped(&parent))
    });
    if has_text {
        return true;
    }

    let media = Selector::parse("img, video, picture, source").unwrap();
    element.select(&media).any(|el| !is_stripped(&el))
}

/// Pick the main content subtree. Falls back to `<body>`; `None` only when the
/// document has no body at all. The second value names the rule that matched.
pub fn select_content(document: &Html) -> Option<(ElementRef<'_>, &'static str)> {
    for rule in CONTENT_RULES {
        let selector = Selector::parse(rule).unwrap();
        if let Some(found) = document
            .select(&selector)
            .find(|el| !is_stripped(el) && has_content(el))
        {
            return Some((found, rule));
        }
    }

    let body = Selector::parse("body").unwrap();
    document.select(&body).next().map(|el| (el, "body"))
}

/// Serialize `root` back to HTML, skipping stripped subtrees and comments.
/// `rewrite` may replace (or add) one attribute per element.
pub fn serialize_fragment(root: ElementRef, rewrite: &dyn Fn(&Element) -> AttrOverride) -> String {
    let mut out = String::new();
    write_element(&mut out, root, rewrite);
    out
}

fn write_element(out: &mut String, element: ElementRef, rewrite: &dyn Fn(&Element) -> AttrOverride) {
    let value = element.value();
    let name = value.name();
    if is_strip_tag(name) {
        return;
    }

    let replacement = rewrite(value);
    out.push('<');
    out.push_str(name);
    let mut replaced = false;
    for (attr, attr_value) in value.attrs() {
        let attr_value = match &replacement {
            Some((target, new_value)) if *target == attr => {
                replaced = true;
                new_value.as_str()
            }
            _ => attr_value,
        };
        let _ = write!(out, " {}=\"{}\"", attr, escape_attr(attr_value));
    }
    if let Some((target, new_value)) = &replacement
        && !replaced
    {
        let _ = write!(out, " {}=\"{}\"", target, escape_attr(new_value));
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(out, child_element, rewrite);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(&escape_text(text));
        }
    }

    let _ = write!(out, "</{}>", name);
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_rewrite(_: &Element) -> AttrOverride {
        None
    }

    #[test]
    fn test_main_wins_over_article() {
        let doc = Html::parse_document(
            "<body><article><p>a</p></article><main><p>b</p></main></body>",
        );
        let (el, rule) = select_content(&doc).unwrap();
        assert_eq!(rule, "main");
        assert_eq!(el.text().collect::<String>(), "b");
    }

    #[test]
    fn test_rules_follow_priority_order() {
        let doc = Html::parse_document(
            r#"<body><div class="content">c</div><div id="main-content">m</div></body>"#,
        );
        let (_, rule) = select_content(&doc).unwrap();
        assert_eq!(rule, "div#main-content");
    }

    #[test]
    fn test_empty_match_is_skipped() {
        let doc = Html::parse_document(
            r#"<body><main>   </main><article><p>text</p></article></body>"#,
        );
        let (_, rule) = select_content(&doc).unwrap();
        assert_eq!(rule, "article");
    }

    #[test]
    fn test_match_inside_stripped_tag_is_ignored() {
        let doc = Html::parse_document(
            r#"<body><header><main>menu</main></header><p>body text</p></body>"#,
        );
        let (_, rule) = select_content(&doc).unwrap();
        assert_eq!(rule, "body");
    }

    #[test]
    fn test_serialize_drops_stripped_subtrees_and_comments() {
        let doc = Html::parse_document(
            "<body><main><nav>menu</nav><!-- c --><p>keep &amp; this</p><script>x()</script></main></body>",
        );
        let (el, _) = select_content(&doc).unwrap();
        let html = serialize_fragment(el, &no_rewrite);
        assert_eq!(html, "<main><p>keep &amp; this</p></main>");
    }

    #[test]
    fn test_serialize_applies_attribute_override() {
        let doc = Html::parse_document(
            r#"<body><main><a href="/x" title="t">x</a><img data-src="p.png"></main></body>"#,
        );
        let (el, _) = select_content(&doc).unwrap();
        let rewrite = |e: &Element| -> AttrOverride {
            match e.name() {
                "a" => Some(("href", "x.md".to_string())),
                "img" => Some(("src", "images/p.png".to_string())),
                _ => None,
            }
        };
        let html = serialize_fragment(el, &rewrite);
        assert!(html.contains(r#"<a href="x.md" title="t">x</a>"#));
        assert!(html.contains(r#"src="images/p.png""#));
        assert!(!html.contains("</img>"));
    }
}
