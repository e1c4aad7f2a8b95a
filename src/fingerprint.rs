// File: ./src/fingerprint.rs
// A stable anonymous id for this installation, used to dedupe views and likes.
use crate::storage::LocalStorage;
use crate::token;
use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::Path;
use uuid::Uuid;

const FILE_NAME: &str = "fingerprint";
pub const PREFIX: &str = "todo-app-";

#[derive(Serialize)]
struct HostTraits {
    os: &'static str,
    arch: &'static str,
    family: &'static str,
    cpus: usize,
    lang: Option<String>,
    user: Option<String>,
    // Two machines with identical traits still get different ids.
    random: String,
}

impl HostTraits {
    fn collect() -> Self {
        Self {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
            cpus: std::thread::available_parallelism().map_or(1, |n| n.get()),
            lang: env::var("LANG").ok(),
            user: env::var("USER").or_else(|_| env::var("USERNAME")).ok(),
            random: Uuid::new_v4().simple().to_string(),
        }
    }
}

pub struct Fingerprint;

impl Fingerprint {
    /// Returns the fingerprint stored in `dir`, creating and storing one first
    /// if there is none yet.
    pub fn load_or_create<P: AsRef<Path>>(dir: P) -> Result<String> {
        let path = dir.as_ref().join(FILE_NAME);
        if let Ok(existing) = fs::read_to_string(&path) {
            let existing = existing.trim();
            if existing.starts_with(PREFIX) {
                return Ok(existing.to_string());
            }
        }

        let fingerprint = Self::generate()?;
        fs::create_dir_all(dir.as_ref())?;
        LocalStorage::atomic_write(&path, &fingerprint)?;
        Ok(fingerprint)
    }

    pub fn generate() -> Result<String> {
        let traits = serde_json::to_string(&HostTraits::collect())?;
        let digest = Sha256::digest(traits.as_bytes());
        Ok(format!("{}{}", PREFIX, token::hex(&digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_sha256() {
        let fp = Fingerprint::generate().unwrap();
        assert!(fp.starts_with(PREFIX));
        assert_eq!(fp.len(), PREFIX.len() + 64);
        assert_ne!(fp, Fingerprint::generate().unwrap());
    }

    #[test]
    fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let first = Fingerprint::load_or_create(dir.path()).unwrap();
        let second = Fingerprint::load_or_create(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn replaces_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "???").unwrap();
        let fp = Fingerprint::load_or_create(dir.path()).unwrap();
        assert!(fp.starts_with(PREFIX));
    }
}
