use tracing::warn;

/// Convert a serialized HTML fragment to Markdown.
///
/// Trailing whitespace is stripped from every line and runs of blank lines
/// collapse to one. `None` when nothing readable is left.
pub fn html_to_markdown(fragment: &str) -> Option<String> {
    let markdown = match htmd::convert(fragment) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!(error = %e, "HTML to Markdown conversion failed");
            return None;
        }
    };

    let normalized = normalize_markdown(&markdown);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn normalize_markdown(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in markdown.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
