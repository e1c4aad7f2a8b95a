// File: ./src/store/mod.rs
// Persistence backends for list records.
pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::model::TodoList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a backend persists per list. Counters on `list` are derived from the
/// fingerprint sets whenever the record leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredList {
    pub list: TodoList,
    pub edit_token_hash: String,
    #[serde(default)]
    pub viewers: BTreeSet<String>,
    #[serde(default)]
    pub likers: BTreeSet<String>,
}

impl StoredList {
    pub fn id(&self) -> &str {
        &self.list.id
    }

    /// Public view of the record.
    pub fn snapshot(&self) -> TodoList {
        let mut list = self.list.clone();
        list.view_count = self.viewers.len() as u64;
        list.like_count = self.likers.len() as u64;
        list
    }
}

pub trait ListStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<StoredList>, StoreError>;
    fn save(&self, record: &StoredList) -> Result<(), StoreError>;
    fn remove(&self, id: &str) -> Result<bool, StoreError>;
    fn all(&self) -> Result<Vec<StoredList>, StoreError>;
}
