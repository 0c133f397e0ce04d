//! Persistent Tier Module
//!
//! Disk-backed store keeping one JSON file per key. File names are the hex
//! SHA-256 of the key, so the directory listing is the only index.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{Entry, PersistentStats};
use crate::error::Result;

/// Extension identifying files managed by a PersistentCache.
pub const CACHE_FILE_EXTENSION: &str = "cache";

// == Persistent Cache ==
/// Disk tier guarded by one coarse lock; all I/O happens while holding it.
///
/// Unreadable or expired files behave exactly like missing ones and are
/// deleted when found.
#[derive(Debug)]
pub struct PersistentCache {
    dir: PathBuf,
    default_ttl: u64,
    record_access: bool,
    lock: Mutex<()>,
}

impl PersistentCache {
    // == Constructor ==
    /// Opens (creating if needed) a persistent tier rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, default_ttl: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), default_ttl, "persistent cache initialized");
        Ok(Self {
            dir,
            default_ttl,
            record_access: true,
            lock: Mutex::new(()),
        })
    }

    /// Controls whether a hit rewrites the file with updated access stats.
    pub fn with_record_access(mut self, enabled: bool) -> Self {
        self.record_access = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// File holding `key`'s entry.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key_digest(key), CACHE_FILE_EXTENSION))
    }

    // == Get ==
    /// Reads a value from disk.
    ///
    /// Missing, corrupted and expired files all yield None; the latter two
    /// are deleted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock();
        let path = self.path_for(key);

        let mut entry = match read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(reason) => {
                warn!(key, path = %path.display(), %reason, "discarding unreadable cache file");
                remove_file_quietly(&path);
                return None;
            }
        };

        let now = Utc::now();
        if entry.is_expired_at(now) {
            debug!(key, "persistent entry expired");
            remove_file_quietly(&path);
            return None;
        }

        entry.access_at(now);
        if self.record_access {
            if let Err(err) = write_entry(&path, &entry) {
                warn!(key, error = %err, "failed to record access on persistent entry");
            }
        }
        Some(entry.value)
    }

    // == Set ==
    /// Writes a fresh entry for `key`, overwriting any previous file.
    pub fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let _guard = self.lock.lock();
        let path = self.path_for(key);

        let entry = Entry::new(key, value, ttl);
        match write_entry(&path, &entry) {
            Ok(()) => {
                debug!(key, ttl, "persistent cache set");
                Ok(())
            }
            Err(err) => {
                warn!(key, path = %path.display(), error = %err, "persistent cache write failed");
                Err(err)
            }
        }
    }

    // == Delete ==
    /// Removes `key`'s file. Returns whether one was removed.
    pub fn delete(&self, key: &str) -> bool {
        let _guard = self.lock.lock();
        let path = self.path_for(key);

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "persistent cache deleted");
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => {
                warn!(key, error = %err, "persistent cache delete failed");
                false
            }
        }
    }

    // == Clear ==
    /// Removes every managed file. Other files in the directory are untouched.
    pub fn clear(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        let mut removed = 0;

        for path in self.managed_files()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "failed to remove cache file"),
            }
        }

        debug!(removed, "persistent cache cleared");
        Ok(removed)
    }

    // == Cleanup Expired ==
    /// Deletes expired or unreadable files and returns how many were removed.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        let now = Utc::now();
        let mut removed = 0;

        for path in self.managed_files()? {
            let stale = match read_entry(&path) {
                Ok(Some(entry)) => entry.is_expired_at(now),
                // Vanished between listing and reading
                Ok(None) => continue,
                Err(_) => true,
            };
            if !stale {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "failed to remove stale cache file"),
            }
        }

        if removed > 0 {
            debug!(removed, "persistent cleanup removed stale files");
        }
        Ok(removed)
    }

    // == Stats ==
    /// File count and total size of the managed files.
    pub fn stats(&self) -> Result<PersistentStats> {
        let _guard = self.lock.lock();
        let files = self.managed_files()?;
        let total_bytes = files
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();

        Ok(PersistentStats {
            files: files.len(),
            total_bytes,
            cache_dir: self.dir.clone(),
        })
    }

    /// Reads the stored entry without recording an access.
    pub fn peek(&self, key: &str) -> Option<Entry> {
        let _guard = self.lock.lock();
        read_entry(&self.path_for(key)).ok().flatten()
    }

    /// Paths of every `*.cache` file in the directory.
    fn managed_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let managed = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_FILE_EXTENSION);
            if managed {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// Hex SHA-256 of a key, used as its file stem.
pub fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Ok(None) when the file does not exist; Err with a reason when it exists
/// but cannot be read or decoded.
fn read_entry(path: &Path) -> std::result::Result<Option<Entry>, String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.to_string()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| err.to_string())
}

fn write_entry(path: &Path, entry: &Entry) -> Result<()> {
    let bytes = serde_json::to_vec(entry)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn remove_file_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove cache file");
        }
    }
}
