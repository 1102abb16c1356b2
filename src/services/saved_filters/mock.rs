use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{validate_filters, validate_name, SavedFilterError, SavedFilterRepository};
use crate::models::saved_filter::SavedFilterSet;

#[derive(Clone, Default)]
pub struct MockSavedFilterRepository {
    pub rows: Arc<Mutex<Vec<SavedFilterSet>>>,
}

impl MockSavedFilterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify<F>(&self, id: Uuid, apply: F) -> Result<SavedFilterSet, SavedFilterError>
    where
        F: FnOnce(&mut SavedFilterSet),
    {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(SavedFilterError::NotFound(id))?;
        apply(row);
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }
}

#[async_trait]
impl SavedFilterRepository for MockSavedFilterRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedFilterSet>, SavedFilterError> {
        let mut rows: Vec<SavedFilterSet> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create(
        &self,
        user_id: &str,
        name: &str,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError> {
        let name = validate_name(name)?;
        validate_filters(&filters)?;
        let row = SavedFilterSet {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name,
            filters,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn rename(&self, id: Uuid, name: &str) -> Result<SavedFilterSet, SavedFilterError> {
        let name = validate_name(name)?;
        self.modify(id, |row| row.name = name)
    }

    async fn update_filters(
        &self,
        id: Uuid,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError> {
        validate_filters(&filters)?;
        self.modify(id, |row| row.filters = filters)
    }

    async fn delete(&self, id: Uuid) -> Result<(), SavedFilterError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(SavedFilterError::NotFound(id));
        }
        Ok(())
    }
}
