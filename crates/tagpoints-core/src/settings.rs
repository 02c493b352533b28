//! User settings read from the shared store once per task invocation.

use crate::error::StoreError;
use crate::store::{get_json, set_json, KeyValueStore};

pub const ASSOCIATE_ID_KEY: &str = "associateId";
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Snapshot of the user's settings, passed explicitly into each operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub associate_id: Option<String>,
    pub auth_token: Option<String>,
}

impl Settings {
    /// Reads both settings from `store`. Blank values read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails or a value is not a string.
    pub async fn load<S: KeyValueStore>(store: &S) -> Result<Self, StoreError> {
        let associate_id = get_json::<_, String>(store, ASSOCIATE_ID_KEY).await?;
        let auth_token = get_json::<_, String>(store, AUTH_TOKEN_KEY).await?;
        Ok(Self {
            associate_id: associate_id.filter(|s| !s.trim().is_empty()),
            auth_token: auth_token.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Persists the associate ID entered by the user.
///
/// # Errors
///
/// Returns [`StoreError`] if the store fails.
pub async fn save_associate_id<S: KeyValueStore>(
    store: &S,
    associate_id: &str,
) -> Result<(), StoreError> {
    set_json(store, ASSOCIATE_ID_KEY, associate_id.trim()).await
}

/// Persists the backend bearer token.
///
/// # Errors
///
/// Returns [`StoreError`] if the store fails.
pub async fn save_auth_token<S: KeyValueStore>(store: &S, token: &str) -> Result<(), StoreError> {
    set_json(store, AUTH_TOKEN_KEY, token.trim()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn empty_store_has_no_settings() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn saved_settings_load_trimmed() {
        let store = MemoryStore::new();
        save_associate_id(&store, "  shopper-21 ").await.unwrap();
        save_auth_token(&store, "jwt-token").await.unwrap();
        let settings = Settings::load(&store).await.unwrap();
        assert_eq!(settings.associate_id.as_deref(), Some("shopper-21"));
        assert_eq!(settings.auth_token.as_deref(), Some("jwt-token"));
    }

    #[tokio::test]
    async fn blank_token_reads_as_none() {
        let store = MemoryStore::new();
        save_auth_token(&store, "   ").await.unwrap();
        assert!(Settings::load(&store).await.unwrap().auth_token.is_none());
    }
}
