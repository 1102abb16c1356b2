//! Durable key/value text storage, the local equivalent of browser `localStorage`.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

pub const SUBSCRIPTION_CACHE_KEY: &str = "subscription_status_cache";
pub const COOKIE_CONSENT_KEY: &str = "cookie_consent";
/// Written by the web front-end, never by this crate.
pub const SAVED_SEARCH_DRAFT_KEY: &str = "saved_search_draft";

/// Known keys that hold user data in the shared store, including keys owned
/// by the front-end. Used by the consent export/delete utility.
pub const KNOWN_USER_DATA_KEYS: &[&str] = &[
    COOKIE_CONSENT_KEY,
    SUBSCRIPTION_CACHE_KEY,
    SAVED_SEARCH_DRAFT_KEY,
];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns whether the key was present.
    fn remove_item(&self, key: &str) -> Result<bool, StorageError>;
}
