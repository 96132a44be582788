//! Key-value storage backends for the sign-in session

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{AuthError, AuthResult};

/// String key-value storage scoped to one session
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> AuthResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;
    fn remove(&self, key: &str) -> AuthResult<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        (**self).remove(key)
    }
}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> AuthResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Storage("Memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object file, rewritten on every change.
///
/// Reads and writes use blocking `std::fs` calls and run on the caller's
/// thread, including from inside `AuthMachine` while its state lock is held.
/// The file holds two short entries, so the runtime thread is only blocked
/// briefly; larger stores should move this onto `spawn_blocking`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> AuthResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> AuthResult<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuthError::Storage("File storage lock poisoned".to_string()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("erebrus-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("token").unwrap(), None);

        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("abc"));

        storage.remove("token").unwrap();
        assert_eq!(storage.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let path = temp_path("reopen");
        {
            let storage = FileStorage::new(&path);
            storage.set("address", "0xA1").unwrap();
            storage.set("token", "tokA1").unwrap();
        }

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("address").unwrap().as_deref(), Some("0xA1"));
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("tokA1"));

        reopened.remove("token").unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
        assert_eq!(reopened.get("address").unwrap().as_deref(), Some("0xA1"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let storage = FileStorage::new(temp_path("missing"));
        assert_eq!(storage.get("address").unwrap(), None);
        // Removing from a missing file is not an error
        storage.remove("address").unwrap();
        let _ = fs::remove_file(storage.path());
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();
        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get("token"), Err(AuthError::Storage(_))));
        let _ = fs::remove_file(&path);
    }
}
