use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const MAX_FILTER_SET_NAME_LEN: usize = 80;

/// A named job-search filter combination, stored in `saved_filter_sets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilterSet {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub filters: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSavedFilterSet {
    pub user_id: String,
    pub name: String,
    pub filters: Value,
}
