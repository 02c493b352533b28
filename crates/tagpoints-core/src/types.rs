use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SESSION_TTL_MINUTES;

/// Items and total captured while the shopper is on a checkout page.
///
/// Overwritten on every re-scan of the checkout page and consumed once a
/// confirmation page validates against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Lowercased, whitespace-collapsed product descriptions.
    pub descriptions: BTreeSet<String>,
    /// Order total in USD, when one could be extracted.
    pub order_total: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub source_url: String,
}

impl CheckoutSession {
    #[must_use]
    pub fn new(
        descriptions: BTreeSet<String>,
        order_total: Option<f64>,
        source_url: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            descriptions,
            order_total,
            timestamp: now,
            session_id: Uuid::new_v4(),
            source_url: source_url.to_owned(),
        }
    }

    /// Returns `true` once the session is older than the 30-minute lifetime.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > TimeDelta::minutes(SESSION_TTL_MINUTES)
    }
}

/// One fingerprint in the processed-purchases collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFingerprintEntry {
    pub fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

/// A validated purchase on its way to the backend.
///
/// Serializes to the `data` payload of a `PURCHASE_COMPLETED` message, which
/// names the fingerprint `purchaseHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    #[serde(rename = "purchaseHash")]
    pub fingerprint: String,
    pub points: u32,
    pub affiliate_tag: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}
