use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::subscription::SubscriptionStatus;
use crate::storage::{LocalStore, StorageError, SUBSCRIPTION_CACHE_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub user_id: String,
    pub data: SubscriptionStatus,
    /// Unix milliseconds.
    pub cached_at: i64,
}

/// Last-known subscription status, one record for whichever user was fetched last.
#[derive(Clone)]
pub struct StatusCache {
    store: Arc<dyn LocalStore>,
}

impl StatusCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn record(&self) -> Option<CacheRecord> {
        let raw = match self.store.get_item(SUBSCRIPTION_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(?err, "subscription cache unreadable");
                return None;
            }
        };

        match serde_json::from_str::<CacheRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(?err, "subscription cache corrupt; ignoring");
                None
            }
        }
    }

    /// Returns the cached status only if it belongs to `user_id`.
    pub fn read(&self, user_id: &str) -> Option<SubscriptionStatus> {
        self.record()
            .filter(|record| record.user_id == user_id)
            .map(|record| record.data)
    }

    pub fn write(&self, user_id: &str, status: &SubscriptionStatus) -> Result<(), StorageError> {
        let record = CacheRecord {
            user_id: user_id.to_string(),
            data: status.clone(),
            cached_at: Utc::now().timestamp_millis(),
        };
        let encoded = serde_json::to_string(&record)?;
        self.store.set_item(SUBSCRIPTION_CACHE_KEY, &encoded)
    }
}
