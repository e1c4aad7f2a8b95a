// File: ./src/store/file.rs
// One JSON document per list, the same write discipline as the local cache.
use super::{ListStore, StoredList};
use crate::error::StoreError;
use crate::storage::LocalStorage;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PREFIX: &str = "list_";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only canonical UUIDs map to a file; anything else cannot exist.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let parsed = Uuid::parse_str(id).ok()?;
        if parsed.hyphenated().to_string() != id {
            return None;
        }
        Some(self.root.join(format!("{}{}.json", PREFIX, id)))
    }

    fn read(path: &Path) -> Result<Option<StoredList>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl ListStore for FileStore {
    fn load(&self, id: &str) -> Result<Option<StoredList>, StoreError> {
        match self.path_for(id) {
            Some(path) => Self::read(&path),
            None => Ok(None),
        }
    }

    fn save(&self, record: &StoredList) -> Result<(), StoreError> {
        let path = self.path_for(record.id()).ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a list id: {}", record.id()),
            ))
        })?;
        let json = serde_json::to_string_pretty(record)?;
        LocalStorage::with_lock(&path, || LocalStorage::atomic_write(&path, &json))?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(false);
        };
        let removed = LocalStorage::with_lock(&path, || {
            if path.exists() {
                fs::remove_file(&path)?;
                Ok(true)
            } else {
                Ok(false)
            }
        })?;
        let _ = fs::remove_file(path.with_extension("lock"));
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<StoredList>, StoreError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_list = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(".json"));
            if !is_list {
                continue;
            }
            match Self::read(&path) {
                Ok(Some(record)) => out.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable list"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = Uuid::new_v4().to_string();
        crate::store::testing::exercise(&store, &id);
    }

    #[test]
    fn non_uuid_ids_never_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.load("../../etc/passwd").unwrap().is_none());
        assert!(!store.remove("../x").unwrap());
        let rec = crate::store::testing::record("not-a-uuid");
        assert!(store.save(&rec).is_err());
    }

    #[test]
    fn corrupt_files_are_skipped_in_scans() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = Uuid::new_v4().to_string();
        store.save(&crate::store::testing::record(&id)).unwrap();
        fs::write(dir.path().join("list_broken.json"), "{not json").unwrap();
        assert_eq!(store.all().unwrap().len(), 1);
    }
}
