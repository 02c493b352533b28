//! Content fingerprints for order-confirmation pages.
//!
//! A fingerprint identifies "this confirmation page" across reloads and DOM
//! re-scans. It is computed over the region between the confirmation banner
//! and the recent-orders footer, with clock-dependent text removed, so that
//! two views of the same order produce the same value while different orders
//! almost never collide.
//!
//! The hash is a 53-bit multiply-xor mix and is not collision resistant
//! against an adversary.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::text::{body_or_root, text_lines};

/// Banner shown at the top of a confirmation page. Lowercase.
pub const CONFIRMATION_MARKER: &str = "order placed, thank you";

/// Footer link text below the order summary. Lowercase.
pub const ORDERS_MARKER: &str = "review or edit your recent orders";

static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?\b",
    )
    .expect("valid iso date regex")
});
static MONTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b",
    )
    .expect("valid month date regex")
});
static DAY_MONTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+\d{4}\b")
        .expect("valid day month date regex")
});
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?(?:\s?[ap]\.?m\b\.?)?")
        .expect("valid time regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Which part of the page a fingerprint was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintScope {
    /// The smallest element containing both marker phrases.
    Markers,
    /// Whole visible body; at least one marker was missing.
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub value: String,
    pub scope: FingerprintScope,
}

/// Fingerprints a confirmation page.
#[must_use]
pub fn fingerprint(html: &str) -> Fingerprint {
    let document = Html::parse_document(html);

    let (raw, scope) = match marker_region(&document) {
        Some(region) => (region_content(region), FingerprintScope::Markers),
        None => {
            tracing::debug!("confirmation markers not found; fingerprinting whole body");
            let body = body_or_root(&document)
                .map(|root| text_lines(root).join("\n"))
                .unwrap_or_default();
            (body, FingerprintScope::Body)
        }
    };

    Fingerprint {
        value: fingerprint_text(&raw),
        scope,
    }
}

/// Cleans `raw` and hashes it. Identical cleaned text always gives the same
/// value.
#[must_use]
pub fn fingerprint_text(raw: &str) -> String {
    to_base36(hash53(clean_text(raw).as_bytes()))
}

/// Removes dates and times of day, then collapses whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let text = ISO_DATE_RE.replace_all(raw, " ");
    let text = MONTH_DATE_RE.replace_all(&text, " ");
    let text = DAY_MONTH_DATE_RE.replace_all(&text, " ");
    let text = TIME_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_owned()
}

/// Smallest element whose visible text contains both markers.
///
/// Among elements with equally short text, the deepest one wins.
fn marker_region(document: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(usize, ElementRef<'_>)> = None;
    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        let text = text_lines(element).join(" ");
        let normalized = WHITESPACE_RE.replace_all(&text, " ").to_lowercase();
        if !(normalized.contains(CONFIRMATION_MARKER) && normalized.contains(ORDERS_MARKER)) {
            continue;
        }
        if best.as_ref().is_none_or(|(len, _)| normalized.len() <= *len) {
            best = Some((normalized.len(), element));
        }
    }
    best.map(|(_, element)| element)
}

/// Text lines of `region` followed by the `href` of each link inside it.
fn region_content(region: ElementRef<'_>) -> String {
    let mut lines = text_lines(region);
    lines.extend(
        region
            .select(&LINK_SELECTOR)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_owned),
    );
    lines.join("\n")
}

/// 53-bit hash built from two 32-bit multiply-xor accumulators.
///
/// Matches the widely used `cyrb53` construction with seed 0, folded over
/// bytes rather than UTF-16 code units.
#[must_use]
pub fn hash53(bytes: &[u8]) -> u64 {
    let mut h1: u32 = 0xdead_beef;
    let mut h2: u32 = 0x41c6_ce57;
    for &byte in bytes {
        h1 = (h1 ^ u32::from(byte)).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ u32::from(byte)).wrapping_mul(1_597_334_677);
    }
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507);
    h1 ^= (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507);
    h2 ^= (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);
    (u64::from(h2 & 0x1f_ffff) << 32) | u64::from(h1)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::with_capacity(11);
    while value > 0 {
        // value % 36 < 36, so the index cast cannot truncate.
        #[allow(clippy::cast_possible_truncation)]
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}
