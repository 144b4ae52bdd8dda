//! On-disk layout of a board data directory
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   board.toml                        # Board configuration
//!   users/<user>/tasks/<id>.json      # One document per task (documents store)
//!   local/join_tasks_<user>.json      # Whole collection as one array (local store)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "board.toml";

/// Prefix of the per-user local collection file
pub const LOCAL_KEY_PREFIX: &str = "join_tasks_";

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Directory holding one JSON document per task of `user`
    pub fn tasks_dir(&self, user: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("users")
            .join(path_segment("user", user)?)
            .join("tasks"))
    }

    pub fn task_document(&self, user: &str, task_id: &str) -> Result<PathBuf> {
        Ok(self
            .tasks_dir(user)?
            .join(format!("{}.json", path_segment("task id", task_id)?)))
    }

    /// Single-array collection file, keyed the way browser storage keys it
    pub fn local_tasks_file(&self, user: &str) -> Result<PathBuf> {
        Ok(self.root.join("local").join(format!(
            "{LOCAL_KEY_PREFIX}{}.json",
            path_segment("user", user)?
        )))
    }

    // =========================================================================
    // JSON helpers (atomic writes under a sibling lock)
    // =========================================================================

    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic_locked(path, json.as_bytes(), self.lock_timeout_ms)
    }

    /// `Ok(None)` when the file does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match lock::read_optional(path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Locked read-modify-write. A missing file starts from `T::default()`.
    pub fn update_json<T, R, F>(&self, path: &Path, f: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let _lock = FileLock::acquire(lock::lock_path_for(path), self.lock_timeout_ms)?;

        let mut value: T = self.read_json(path)?.unwrap_or_default();
        let result = f(&mut value)?;

        let json = serde_json::to_string_pretty(&value)?;
        lock::write_atomic(path, json.as_bytes())?;
        Ok(result)
    }

    /// Remove a document and its lock file. Missing files are not an error.
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        let _lock = FileLock::acquire(lock::lock_path_for(path), self.lock_timeout_ms)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// Ids become file names, so they must stay a single path component.
fn path_segment<'a>(what: &str, raw: &'a str) -> Result<&'a str> {
    let trimmed = raw.trim();
    let bad = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::InvalidArgument(format!("invalid {what} '{raw}'")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths() {
        let storage = Storage::new("/data", 100);
        assert_eq!(storage.config_file(), PathBuf::from("/data/board.toml"));
        assert_eq!(
            storage.task_document("u1", "1718000000000").unwrap(),
            PathBuf::from("/data/users/u1/tasks/1718000000000.json")
        );
        assert_eq!(
            storage.local_tasks_file("guest").unwrap(),
            PathBuf::from("/data/local/join_tasks_guest.json")
        );
    }

    #[test]
    fn ids_cannot_escape_the_data_dir() {
        let storage = Storage::new("/data", 100);
        assert!(storage.tasks_dir("../etc").is_err());
        assert!(storage.task_document("u1", "a/b").is_err());
        assert!(storage.local_tasks_file("").is_err());
    }

    #[test]
    fn update_json_starts_from_default() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), 1000);
        let path = temp_dir.path().join("list.json");

        let len = storage
            .update_json(&path, |items: &mut Vec<u32>| {
                items.push(7);
                Ok(items.len())
            })
            .unwrap();
        assert_eq!(len, 1);

        let stored: Vec<u32> = storage.read_json(&path).unwrap().unwrap();
        assert_eq!(stored, vec![7]);
    }

    #[test]
    fn failed_update_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), 1000);
        let path = temp_dir.path().join("list.json");
        storage.write_json(&path, &vec![1u32]).unwrap();

        let result = storage.update_json(&path, |items: &mut Vec<u32>| -> Result<()> {
            items.clear();
            Err(Error::OperationFailed("boom".to_string()))
        });
        assert!(result.is_err());

        let stored: Vec<u32> = storage.read_json(&path).unwrap().unwrap();
        assert_eq!(stored, vec![1]);
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), 1000);
        assert!(!storage.remove_file(&temp_dir.path().join("gone.json")).unwrap());
    }
}
