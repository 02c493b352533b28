//! Product description capture from checkout and confirmation markup.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Descriptions shorter than this after normalization are noise
/// ("qty", "x1") and are discarded.
const MIN_DESCRIPTION_CHARS: usize = 4;

/// Elements whose text is an item title on checkout or confirmation pages.
static TITLE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "[data-testid='item-title']",
        ".a-truncate-full",
        ".item-title",
        ".lineitem-title-text",
        ".yohtmlc-product-title",
        ".checkout-item-title",
        "[data-asin] .a-text-bold",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid title selector"))
    .collect()
});

/// Product thumbnails whose `alt` text is the item title.
static IMAGE_ALT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".item-image img[alt], .shipment img[alt], [data-asin] img[alt]")
        .expect("valid image selector")
});

/// Lowercases, collapses whitespace and trims. Returns `None` for strings too
/// short to identify a product.
#[must_use]
pub fn normalize_description(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (normalized.chars().count() >= MIN_DESCRIPTION_CHARS).then_some(normalized)
}

/// Collects the normalized item descriptions present in `html`.
#[must_use]
pub fn extract_descriptions(html: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);

    let titles = TITLE_SELECTORS.iter().flat_map(|selector| {
        document
            .select(selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
    });
    let alts = document
        .select(&IMAGE_ALT_SELECTOR)
        .filter_map(|img| img.value().attr("alt").map(str::to_owned));

    let descriptions: BTreeSet<String> = titles
        .chain(alts)
        .filter_map(|raw| normalize_description(&raw))
        .collect();

    tracing::debug!(count = descriptions.len(), "captured item descriptions");
    descriptions
}
