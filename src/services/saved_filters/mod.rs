use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::models::saved_filter::{SavedFilterSet, MAX_FILTER_SET_NAME_LEN};

#[derive(Debug, thiserror::Error)]
pub enum SavedFilterError {
    #[error("invalid filter set: {0}")]
    Validation(String),
    #[error("saved filter set {0} not found")]
    NotFound(Uuid),
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store responded with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("remote store returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// CRUD for a user's saved job-search filters.
#[async_trait]
pub trait SavedFilterRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<SavedFilterSet>, SavedFilterError>;

    async fn create(
        &self,
        user_id: &str,
        name: &str,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError>;

    async fn rename(&self, id: Uuid, name: &str) -> Result<SavedFilterSet, SavedFilterError>;

    async fn update_filters(
        &self,
        id: Uuid,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError>;

    async fn delete(&self, id: Uuid) -> Result<(), SavedFilterError>;
}

pub fn validate_name(name: &str) -> Result<String, SavedFilterError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SavedFilterError::Validation("name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_FILTER_SET_NAME_LEN {
        return Err(SavedFilterError::Validation(format!(
            "name must be at most {} characters",
            MAX_FILTER_SET_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_filters(filters: &Value) -> Result<(), SavedFilterError> {
    if filters.is_object() {
        Ok(())
    } else {
        Err(SavedFilterError::Validation(
            "filters must be a JSON object".into(),
        ))
    }
}

mod mock;
mod postgrest;

pub use mock::MockSavedFilterRepository;
pub use postgrest::PostgrestSavedFilterRepository;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Remote Rust  ").unwrap(), "Remote Rust");
        assert!(matches!(
            validate_name("   "),
            Err(SavedFilterError::Validation(_))
        ));
        assert!(validate_name(&"x".repeat(MAX_FILTER_SET_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_FILTER_SET_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn filters_must_be_an_object() {
        assert!(validate_filters(&json!({ "location": "Prague" })).is_ok());
        assert!(validate_filters(&json!(["remote"])).is_err());
        assert!(validate_filters(&Value::Null).is_err());
    }
}
