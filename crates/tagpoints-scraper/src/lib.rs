//! Page scraping for tagpoints: affiliate link rewriting and the
//! purchase-detection heuristics that run over checkout and confirmation
//! pages.
//!
//! Everything here is synchronous and pure. Storage and network concerns live
//! in `tagpoints-core` and `tagpoints-relay`.

pub mod describe;
pub mod fingerprint;
pub mod link;
pub mod page;
pub mod text;
pub mod total;
pub mod validate;

pub use describe::{extract_descriptions, normalize_description};
pub use fingerprint::{fingerprint, fingerprint_text, Fingerprint, FingerprintScope};
pub use link::{has_associate_id, page_links, rewrite, rewrite_links};
pub use page::{classify, is_amazon_url, PageKind};
pub use text::visible_text;
pub use total::{extract_total, extract_total_match, Currency, TotalMatch};
pub use validate::{validate, DescriptionMatch, Validation};
