use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{LocalStore, StorageError};

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.remove(key).is_some())
    }
}
