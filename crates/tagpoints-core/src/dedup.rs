//! Bounded, time-windowed record of purchase fingerprints already awarded.
//!
//! The collection lives under [`PROCESSED_PURCHASES_KEY`] as a JSON array in
//! oldest-first order. Older releases stored bare fingerprint strings; those
//! are stamped with the current time the first time they are read.
//!
//! [`DedupStore::check_and_record`] is one logical read-modify-write. Calls
//! made through the same `DedupStore` are serialized by an async mutex, but
//! two processes sharing one backing store can both observe "not seen" for the
//! same fingerprint. That race is accepted: there is no version token in the
//! store to compare-and-swap against.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{set_json, KeyValueStore};
use crate::types::ProcessedFingerprintEntry;

pub const PROCESSED_PURCHASES_KEY: &str = "processedPurchases";

/// Maximum number of entries kept, independent of age.
pub const MAX_ENTRIES: usize = 1000;

const RETENTION_HOURS: i64 = 24;

/// Outcome of [`DedupStore::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    /// First live sighting; the fingerprint has now been recorded.
    New,
    /// A live entry already exists; nothing was written.
    AlreadySeen,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Stamped(ProcessedFingerprintEntry),
    Legacy(String),
}

pub struct DedupStore<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> DedupStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Records `fingerprint` unless a live entry for it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read or written.
    pub async fn check_and_record(&self, fingerprint: &str) -> Result<Seen, StoreError> {
        self.check_and_record_at(fingerprint, Utc::now()).await
    }

    /// [`Self::check_and_record`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read or written.
    pub async fn check_and_record_at(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Seen, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.live_entries_at(now).await?;
        if entries.iter().any(|e| e.fingerprint == fingerprint) {
            tracing::debug!(fingerprint, "purchase fingerprint already processed");
            return Ok(Seen::AlreadySeen);
        }

        entries.push(ProcessedFingerprintEntry {
            fingerprint: fingerprint.to_owned(),
            timestamp: now,
        });
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }

        set_json(self.store.as_ref(), PROCESSED_PURCHASES_KEY, &entries).await?;
        tracing::info!(
            fingerprint,
            stored = entries.len(),
            "recorded new purchase fingerprint"
        );
        Ok(Seen::New)
    }

    /// Returns the entries still inside the retention window, oldest first.
    ///
    /// Legacy string entries are stamped with `now`; elements of any other
    /// shape are skipped individually. This is a pure read:
    /// nothing is written back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    pub async fn live_entries_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProcessedFingerprintEntry>, StoreError> {
        let items = match self.store.get(PROCESSED_PURCHASES_KEY).await? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                tracing::warn!(
                    found = %other,
                    "processed purchases collection is not a list; starting fresh"
                );
                Vec::new()
            }
        };
        let stored = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<StoredEntry>(item.clone()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        entry = %item,
                        "dropping malformed processed purchase entry"
                    );
                    None
                }
            });

        let retention = TimeDelta::hours(RETENTION_HOURS);
        Ok(stored
            .map(|entry| match entry {
                StoredEntry::Stamped(e) => e,
                StoredEntry::Legacy(fingerprint) => ProcessedFingerprintEntry {
                    fingerprint,
                    timestamp: now,
                },
            })
            .filter(|e| now.signed_duration_since(e.timestamp) < retention)
            .collect())
    }
}
