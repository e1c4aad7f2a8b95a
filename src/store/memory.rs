use super::{ListStore, StoredList};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<String, StoredList>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<StoredList>, StoreError> {
        let lists = self.lists.read().map_err(|_| StoreError::Poisoned)?;
        Ok(lists.get(id).cloned())
    }

    fn save(&self, record: &StoredList) -> Result<(), StoreError> {
        let mut lists = self.lists.write().map_err(|_| StoreError::Poisoned)?;
        lists.insert(record.id().to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut lists = self.lists.write().map_err(|_| StoreError::Poisoned)?;
        Ok(lists.remove(id).is_some())
    }

    fn all(&self) -> Result<Vec<StoredList>, StoreError> {
        let lists = self.lists.read().map_err(|_| StoreError::Poisoned)?;
        Ok(lists.values().cloned().collect())
    }
}
