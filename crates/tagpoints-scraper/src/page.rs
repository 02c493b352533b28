//! Classifies Amazon URLs into the pages the purchase pipeline cares about.

use serde::Serialize;
use url::Url;

const CONFIRMATION_PATTERNS: &[&str] = &["thankyou", "thank-you", "order-confirmation"];
const CHECKOUT_PATTERNS: &[&str] = &["/gp/buy/", "/checkout/", "/gp/checkoutportal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Checkout,
    Confirmation,
    Other,
}

/// Returns `true` for `amazon.<tld>` and its subdomains.
#[must_use]
pub fn is_amazon_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            host.split('.')
                .collect::<Vec<_>>()
                .windows(2)
                .any(|pair| pair[0] == "amazon" && !pair[1].is_empty())
        })
}

/// Decides which pipeline stage, if any, a page view belongs to.
///
/// Confirmation paths are checked first: Amazon's thank-you pages live under
/// `/gp/buy/` too.
#[must_use]
pub fn classify(url: &str) -> PageKind {
    if !is_amazon_url(url) {
        return PageKind::Other;
    }
    let lowered = url.to_ascii_lowercase();
    if CONFIRMATION_PATTERNS.iter().any(|p| lowered.contains(p)) {
        PageKind::Confirmation
    } else if CHECKOUT_PATTERNS.iter().any(|p| lowered.contains(p)) {
        PageKind::Checkout
    } else {
        PageKind::Other
    }
}
