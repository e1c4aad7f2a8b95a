use anyhow::{Context, Result};
use directories::ProjectDirs;
use fs2::FileExt;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "TODOBIN_DATA_DIR";

pub struct LocalStorage;

impl LocalStorage {
    /// Data directory: `TODOBIN_DATA_DIR` first, then the platform data dir.
    pub fn data_dir() -> Option<PathBuf> {
        if let Ok(dir) = env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            let path = PathBuf::from(dir);
            if !path.exists() {
                let _ = fs::create_dir_all(&path);
            }
            return Some(path);
        }
        if let Some(proj) = ProjectDirs::from("com", "todobin", "todobin") {
            let data_dir = proj.data_dir();
            if !data_dir.exists() {
                let _ = fs::create_dir_all(data_dir);
            }
            return Some(data_dir.to_path_buf());
        }
        None
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }

    /// Runs `f` while holding an exclusive advisory lock next to `path`.
    pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("opening lock {}", lock_path.display()))?;
        lock_file.lock_exclusive()?;
        let result = f();
        let _ = fs2::FileExt::unlock(&lock_file);
        result
    }
}
