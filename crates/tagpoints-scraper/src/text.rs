//! Visible-text extraction from parsed HTML.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Returns the visible text of the document body: every rendered text node,
/// trimmed, blank ones dropped, joined with `\n`.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    body_or_root(&document).map_or_else(String::new, |root| text_lines(root).join("\n"))
}

pub(crate) fn body_or_root(document: &Html) -> Option<ElementRef<'_>> {
    let body = Selector::parse("body").ok()?;
    document
        .select(&body)
        .next()
        .or_else(|| Some(document.root_element()))
}

/// Trimmed, non-empty, visible text nodes under `root` in document order.
pub(crate) fn text_lines(root: ElementRef<'_>) -> Vec<String> {
    root.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                let trimmed = text.trim();
                (!hidden && !trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            _ => None,
        })
        .collect()
}
