//! Shared types, configuration and persisted state for tagpoints.
//!
//! Everything that survives between page scans lives behind the
//! [`KeyValueStore`] trait: the user's settings, the most recent
//! [`CheckoutSession`] and the bounded list of processed purchase
//! fingerprints. Nothing here caches authoritative state in memory; every
//! operation re-reads and re-writes the store.

pub mod app_config;
pub mod config;
pub mod dedup;
pub mod error;
pub mod messages;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, load_store_path};
pub use dedup::{DedupStore, Seen, MAX_ENTRIES, PROCESSED_PURCHASES_KEY};
pub use error::{ConfigError, StoreError};
pub use messages::{
    PurchaseResponse, ReferralStatus, ReplaceLinksResponse, RuntimeMessage, TabRequest,
    TabResponse, UpdateStatus,
};
pub use session::{CHECKOUT_SESSION_KEY, SESSION_TTL_MINUTES};
pub use settings::{Settings, ASSOCIATE_ID_KEY, AUTH_TOKEN_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{CheckoutSession, ProcessedFingerprintEntry, PurchaseEvent};
