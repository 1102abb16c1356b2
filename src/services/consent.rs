use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::models::consent::ConsentPreferences;
use crate::storage::{LocalStore, StorageError, COOKIE_CONSENT_KEY, KNOWN_USER_DATA_KEYS};

/// Cookie-consent preferences plus the "download / erase my data" utility
/// over everything this client keeps locally.
#[derive(Clone)]
pub struct ConsentManager {
    store: Arc<dyn LocalStore>,
}

impl ConsentManager {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<ConsentPreferences>, StorageError> {
        let Some(raw) = self.store.get_item(COOKIE_CONSENT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => Ok(Some(prefs)),
            Err(err) => {
                debug!(?err, "stored cookie consent unreadable; asking again");
                Ok(None)
            }
        }
    }

    pub fn has_decided(&self) -> Result<bool, StorageError> {
        Ok(self.load()?.is_some())
    }

    pub fn save(&self, prefs: ConsentPreferences) -> Result<ConsentPreferences, StorageError> {
        let prefs = ConsentPreferences {
            necessary: true,
            updated_at: Some(Utc::now()),
            ..prefs
        };
        let encoded = serde_json::to_string(&prefs)?;
        self.store.set_item(COOKIE_CONSENT_KEY, &encoded)?;
        Ok(prefs)
    }

    pub fn accept_all(&self) -> Result<ConsentPreferences, StorageError> {
        self.save(ConsentPreferences::all_accepted())
    }

    pub fn reject_all(&self) -> Result<ConsentPreferences, StorageError> {
        self.save(ConsentPreferences::necessary_only())
    }

    /// Everything stored locally, as one JSON document. Values that are JSON
    /// are embedded as-is, anything else as a string.
    pub fn export_user_data(&self) -> Result<Value, StorageError> {
        let mut data = Map::new();
        for key in KNOWN_USER_DATA_KEYS {
            if let Some(raw) = self.store.get_item(key)? {
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                data.insert((*key).to_string(), value);
            }
        }

        let mut export = Map::new();
        export.insert("exportedAt".into(), Value::String(Utc::now().to_rfc3339()));
        export.insert("data".into(), Value::Object(data));
        Ok(Value::Object(export))
    }

    /// Returns how many keys were actually present.
    pub fn delete_user_data(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in KNOWN_USER_DATA_KEYS {
            if self.store.remove_item(key)? {
                removed += 1;
            }
        }
        info!(removed, "local user data deleted");
        Ok(removed)
    }
}
