//! The purchase pipeline: checkout capture and confirmation detection.
//!
//! Both stages re-read the store on every call. Checkout capture overwrites
//! the single stored session; confirmation detection runs fingerprint,
//! de-duplication and validation, and yields a [`PurchaseEvent`] only for a
//! new, validated order.

use chrono::{DateTime, Utc};
use tagpoints_core::session::{consume_session, load_live_session_at, save_session};
use tagpoints_core::{CheckoutSession, DedupStore, KeyValueStore, PurchaseEvent, Seen, StoreError};
use tagpoints_relay::calculate_points;
use tagpoints_scraper::{extract_descriptions, extract_total, fingerprint, validate, visible_text};

/// Result of scanning a confirmation page.
#[derive(Debug, PartialEq)]
pub(crate) enum Detection {
    /// The fingerprint is already recorded inside the retention window.
    Duplicate { fingerprint: String },
    /// New fingerprint, but no live checkout session to validate against.
    NoSession { fingerprint: String },
    /// New fingerprint whose items do not match the checkout session.
    Mismatch { fingerprint: String },
    /// A new purchase ready for the relay.
    Purchase(PurchaseEvent),
}

/// Captures items and total from a checkout page and stores them as the
/// current session.
///
/// Re-scans of the same checkout URL keep the existing session ID and only
/// refresh its contents and timestamp.
///
/// # Errors
///
/// Returns [`StoreError`] if the session cannot be read or written.
pub(crate) async fn capture_checkout<S: KeyValueStore>(
    store: &S,
    url: &str,
    html: &str,
    now: DateTime<Utc>,
) -> Result<CheckoutSession, StoreError> {
    let descriptions = extract_descriptions(html);
    let order_total = extract_total(&visible_text(html));

    let mut session = CheckoutSession::new(descriptions, order_total, url, now);
    if let Some(previous) = load_live_session_at(store, now).await? {
        if previous.source_url == url {
            session.session_id = previous.session_id;
        }
    }

    save_session(store, &session).await?;
    tracing::info!(
        session_id = %session.session_id,
        items = session.descriptions.len(),
        order_total = ?session.order_total,
        "checkout session captured"
    );
    Ok(session)
}

/// Decides whether a confirmation page is a new, validated purchase.
///
/// The fingerprint is recorded before validation, so a page that fails
/// validation is not re-examined on reload.
///
/// # Errors
///
/// Returns [`StoreError`] if the store fails.
pub(crate) async fn detect_purchase<S: KeyValueStore>(
    store: &S,
    dedup: &DedupStore<S>,
    affiliate_tag: &str,
    url: &str,
    html: &str,
    now: DateTime<Utc>,
) -> Result<Detection, StoreError> {
    let fp = fingerprint(html);
    tracing::debug!(fingerprint = %fp.value, scope = ?fp.scope, "confirmation page fingerprinted");

    if dedup.check_and_record_at(&fp.value, now).await? == Seen::AlreadySeen {
        return Ok(Detection::Duplicate {
            fingerprint: fp.value,
        });
    }

    let Some(session) = load_live_session_at(store, now).await? else {
        tracing::info!(fingerprint = %fp.value, "no live checkout session; skipping award");
        return Ok(Detection::NoSession {
            fingerprint: fp.value,
        });
    };

    let confirmed = extract_descriptions(html);
    let validation = validate(&confirmed, &session.descriptions);
    if !validation.is_valid {
        tracing::info!(
            fingerprint = %fp.value,
            confirmed = confirmed.len(),
            expected = session.descriptions.len(),
            "confirmation items do not match checkout session"
        );
        return Ok(Detection::Mismatch {
            fingerprint: fp.value,
        });
    }

    consume_session(store).await?;
    let points = calculate_points(session.order_total);
    tracing::info!(
        fingerprint = %fp.value,
        matches = validation.matches.len(),
        points,
        "purchase detected"
    );

    Ok(Detection::Purchase(PurchaseEvent {
        fingerprint: fp.value,
        points,
        affiliate_tag: affiliate_tag.to_owned(),
        timestamp: now,
        url: url.to_owned(),
    }))
}
