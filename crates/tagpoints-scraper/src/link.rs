//! Affiliate link rewriting.
//!
//! Amazon product and search URLs carry a long tail of referral and tracking
//! parameters. Rewriting keeps only the parameters that change what page is
//! shown and forces our `tag`.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

/// Query parameters that affect which page is rendered.
const KEEP_PARAMS: &[&str] = &[
    "node",     // category/browse node
    "th",       // product variation
    "psc",      // product selection
    "dp",       // direct product
    "ie",       // character encoding
    "keywords", // search keywords
    "s",        // search
    "k",        // search term
    "i",        // item / search index
    "pd_rd_i",  // product id
];

/// Referral and tracking parameters that must never survive a rewrite, even
/// if they were ever added to [`KEEP_PARAMS`].
const REMOVE_PARAMS: &[&str] = &[
    "ref",
    "ref_",
    "linkCode",
    "language",
    "pd_rd_w",
    "pd_rd_r",
    "pf_rd_p",
    "pf_rd_r",
    "sprefix",
    "crid",
    "_encoding",
    "linkId",
    "initialIssue",
    "pf_rd_s",
    "pf_rd_t",
];

const TAG_PARAM: &str = "tag";

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

fn is_kept(key: &str) -> bool {
    KEEP_PARAMS.contains(&key) && !REMOVE_PARAMS.contains(&key)
}

/// Rewrites `url` so that it carries only allow-listed parameters followed by
/// `tag=<associate_id>`.
///
/// A repeated allow-listed key keeps its first position and its last value.
/// Path and fragment are untouched. If `url` does not parse, it is returned
/// unchanged and a warning is logged.
///
/// Applying the rewrite twice with the same ID yields the same URL.
#[must_use]
pub fn rewrite(url: &str, associate_id: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(url, error = %e, "cannot parse link; leaving it unchanged");
            return url.to_owned();
        }
    };

    let mut kept: Vec<(String, String)> = Vec::new();
    for (key, value) in parsed.query_pairs() {
        if !is_kept(&key) {
            continue;
        }
        if let Some(slot) = kept.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value.into_owned();
        } else {
            kept.push((key.into_owned(), value.into_owned()));
        }
    }

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(TAG_PARAM, associate_id);

    parsed.to_string()
}

/// Returns `true` when the first `tag` parameter of `url` equals
/// `associate_id`. Unparseable URLs never carry the referral.
#[must_use]
pub fn has_associate_id(url: &str, associate_id: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| {
        parsed
            .query_pairs()
            .find(|(key, _)| key == TAG_PARAM)
            .is_some_and(|(_, value)| value == associate_id)
    })
}

/// Rewrites every Amazon link in `hrefs`, returning the new hrefs and how
/// many of them actually changed.
///
/// Non-Amazon links are passed through untouched.
#[must_use]
pub fn rewrite_links<S: AsRef<str>>(hrefs: &[S], associate_id: &str) -> (Vec<String>, usize) {
    let mut changed = 0usize;
    let rewritten = hrefs
        .iter()
        .map(|href| {
            let href = href.as_ref();
            if !href.contains("amazon") {
                return href.to_owned();
            }
            let new_href = rewrite(href, associate_id);
            if new_href != href {
                changed += 1;
            }
            new_href
        })
        .collect();
    (rewritten, changed)
}

/// Every `href` on the page, in document order.
#[must_use]
pub fn page_links(html: &str) -> Vec<String> {
    Html::parse_document(html)
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_owned)
        .collect()
}
