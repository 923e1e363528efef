use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Small key-value store of JSON documents, one file per key. Plays the
/// role browser local storage plays for a web client.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        fs::write(self.path_for(key), serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }

    /// Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.put("answer", &42u32).unwrap();
        assert_eq!(store.get::<u32>("answer").unwrap(), Some(42));
    }

    #[test]
    fn missing_keys_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.get::<u32>("nothing").unwrap(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.put("key", &"value").unwrap();
        store.remove("key").unwrap();
        store.remove("key").unwrap();
        assert_eq!(store.get::<String>("key").unwrap(), None);
    }

    #[test]
    fn corrupt_documents_surface_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        std::fs::write(dir.path().join("bad.json"), b"{not json").unwrap();
        assert!(store.get::<u32>("bad").is_err());
    }
}
