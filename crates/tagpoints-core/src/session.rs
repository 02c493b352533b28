//! Persistence for the single most-recent [`CheckoutSession`].

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::store::{get_json, set_json, KeyValueStore};
use crate::types::CheckoutSession;

pub const CHECKOUT_SESSION_KEY: &str = "checkoutSession";

/// Lifetime of a checkout session before it is treated as absent.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Overwrites the stored checkout session.
///
/// # Errors
///
/// Returns [`StoreError`] if the session cannot be written.
pub async fn save_session<S: KeyValueStore>(
    store: &S,
    session: &CheckoutSession,
) -> Result<(), StoreError> {
    set_json(store, CHECKOUT_SESSION_KEY, session).await
}

/// Loads the checkout session if one exists and has not expired.
///
/// Expired or unreadable sessions are removed and reported as `None`.
///
/// # Errors
///
/// Returns [`StoreError`] if the store itself fails.
pub async fn load_live_session_at<S: KeyValueStore>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Option<CheckoutSession>, StoreError> {
    let session = match get_json::<_, CheckoutSession>(store, CHECKOUT_SESSION_KEY).await {
        Ok(session) => session,
        Err(StoreError::Json { source, .. }) => {
            tracing::warn!(error = %source, "discarding unreadable checkout session");
            store.remove(CHECKOUT_SESSION_KEY).await?;
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    match session {
        Some(session) if session.is_expired_at(now) => {
            tracing::debug!(
                session_id = %session.session_id,
                "checkout session expired"
            );
            store.remove(CHECKOUT_SESSION_KEY).await?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// Deletes the stored checkout session once it has been matched.
///
/// # Errors
///
/// Returns [`StoreError`] if the store fails.
pub async fn consume_session<S: KeyValueStore>(store: &S) -> Result<(), StoreError> {
    store.remove(CHECKOUT_SESSION_KEY).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn session(now: DateTime<Utc>) -> CheckoutSession {
        let mut descriptions = BTreeSet::new();
        descriptions.insert("desk lamp".to_owned());
        CheckoutSession::new(descriptions, Some(19.99), "https://www.amazon.com/gp/buy/spc", now)
    }

    #[tokio::test]
    async fn saved_session_loads_while_fresh() {
        let store = MemoryStore::new();
        let t0 = at("2025-03-01T10:00:00Z");
        let saved = session(t0);
        save_session(&store, &saved).await.unwrap();

        let loaded = load_live_session_at(&store, t0 + TimeDelta::minutes(10))
            .await
            .unwrap();
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent_and_is_removed() {
        let store = MemoryStore::new();
        let t0 = at("2025-03-01T10:00:00Z");
        save_session(&store, &session(t0)).await.unwrap();

        let loaded = load_live_session_at(&store, t0 + TimeDelta::minutes(31))
            .await
            .unwrap();
        assert!(loaded.is_none());
        assert!(store.get(CHECKOUT_SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resave_overwrites_in_place() {
        let store = MemoryStore::new();
        let t0 = at("2025-03-01T10:00:00Z");
        save_session(&store, &session(t0)).await.unwrap();
        let mut second = session(t0 + TimeDelta::minutes(1));
        second.order_total = Some(42.0);
        save_session(&store, &second).await.unwrap();

        let loaded = load_live_session_at(&store, t0 + TimeDelta::minutes(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.order_total, Some(42.0));
    }

    #[tokio::test]
    async fn unreadable_session_is_discarded() {
        let store = MemoryStore::new();
        store
            .set(CHECKOUT_SESSION_KEY, json!({"descriptions": 7}))
            .await
            .unwrap();
        let loaded = load_live_session_at(&store, at("2025-03-01T10:00:00Z"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn consume_removes_session() {
        let store = MemoryStore::new();
        let t0 = at("2025-03-01T10:00:00Z");
        save_session(&store, &session(t0)).await.unwrap();
        consume_session(&store).await.unwrap();
        assert!(load_live_session_at(&store, t0).await.unwrap().is_none());
    }
}
