// File: ./src/cache.rs
// Lists this machine created or duplicated, with their edit tokens.
use crate::storage::LocalStorage;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FILE_NAME: &str = "lists.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownList {
    pub id: String,
    pub edit_token: String,
    #[serde(default)]
    pub title: String,
    pub expires_at: DateTime<Utc>,
}

pub struct Cache {
    path: PathBuf,
}

impl Cache {
    /// The platform cache dir, or `None` when there is no home to put it in.
    pub fn open() -> Option<Self> {
        let proj = ProjectDirs::from("com", "todobin", "todobin")?;
        let cache_dir = proj.cache_dir();
        if !cache_dir.exists() {
            let _ = fs::create_dir_all(cache_dir);
        }
        Some(Self::at(cache_dir))
    }

    pub fn at<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<KnownList>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, lists: &[KnownList]) -> Result<()> {
        let json = serde_json::to_string_pretty(lists)?;
        LocalStorage::atomic_write(&self.path, json)
    }

    fn modify<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<KnownList>) -> T,
    {
        LocalStorage::with_lock(&self.path, || {
            // An unreadable file is left alone rather than overwritten.
            let mut lists = self
                .load()
                .with_context(|| format!("reading list cache {}", self.path.display()))?;
            let out = f(&mut lists);
            self.save(&lists)?;
            Ok(out)
        })
    }

    /// Adds or refreshes an entry; the newest entry goes first.
    pub fn remember(&self, entry: KnownList) -> Result<()> {
        self.modify(|lists| {
            lists.retain(|l| l.id != entry.id);
            lists.insert(0, entry);
        })
    }

    pub fn token_for(&self, id: &str) -> Option<String> {
        self.load()
            .ok()?
            .into_iter()
            .find(|l| l.id == id)
            .map(|l| l.edit_token)
    }

    pub fn forget(&self, id: &str) -> Result<bool> {
        self.modify(|lists| {
            let before = lists.len();
            lists.retain(|l| l.id != id);
            lists.len() != before
        })
    }

    pub fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.modify(|lists| {
            let before = lists.len();
            lists.retain(|l| l.expires_at > now);
            before - lists.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: &str, expires_at: DateTime<Utc>) -> KnownList {
        KnownList {
            id: id.to_string(),
            edit_token: format!("tok-{}", id),
            title: String::new(),
            expires_at,
        }
    }

    #[test]
    fn remembers_and_forgets() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path());
        assert!(cache.load().unwrap().is_empty());

        let later = Utc::now() + Duration::hours(1);
        cache.remember(entry("a", later)).unwrap();
        cache.remember(entry("b", later)).unwrap();
        cache.remember(entry("a", later)).unwrap();

        let ids: Vec<_> = cache.load().unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(cache.token_for("b").as_deref(), Some("tok-b"));
        assert!(cache.forget("b").unwrap());
        assert!(!cache.forget("b").unwrap());
        assert_eq!(cache.token_for("b"), None);
    }

    #[test]
    fn prunes_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path());
        let now = Utc::now();
        cache.remember(entry("old", now - Duration::hours(1))).unwrap();
        cache.remember(entry("new", now + Duration::hours(1))).unwrap();
        assert_eq!(cache.prune_expired(now).unwrap(), 1);
        assert_eq!(cache.load().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path());
        fs::write(cache.path(), "{not json").unwrap();

        assert!(cache.remember(entry("a", Utc::now())).is_err());
        assert!(cache.forget("a").is_err());
        assert_eq!(fs::read_to_string(cache.path()).unwrap(), "{not json");
    }
}
