//! Side-car storage: one pretty-printed JSON file per record in a directory.
//!
//! The link store only holds integers, so record payloads (menu items,
//! users, tokens, passwords) live here keyed by their id.

use crate::error::LinksError;
use crate::types::ValidationError;
use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Extension of record files.
const EXT: &str = "json";

/// Reject keys that could name a file outside the directory.
pub fn check_key(key: &str) -> Result<()> {
    let unsafe_key = key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\', '\0']);
    if unsafe_key {
        return Err(eyre::eyre!(LinksError::Validation(ValidationError::InvalidKey(
            key.to_string()
        ))));
    }
    Ok(())
}

/// A directory of JSON records.
#[derive(Debug, Clone)]
pub struct JsonDir {
    path: PathBuf,
}

impl JsonDir {
    /// Open the directory, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path).wrap_err_with(|| format!("Failed to create data directory {}", path.display()))?;
        log::debug!("Ensured data directory exists: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.path.join(format!("{}.{}", key, EXT)))
    }

    /// Write a record, replacing any previous one.
    pub fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
        let path = self.file(key)?;
        fs::write(&path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    /// Read a record, `None` if it does not exist.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.file(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
        };
        let record = serde_json::from_str(&contents).wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(record))
    }

    /// Remove a record; returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.file(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Keys of all records, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.path).wrap_err_with(|| format!("Failed to list {}", self.path.display()))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Error reading directory {}: {}", self.path.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && check_key(stem).is_ok()
            {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Number of records.
    pub fn count(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Load every readable record; unreadable files are logged and skipped.
    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for key in self.keys()? {
            match self.load(&key) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable record {}: {:#}", key, e),
            }
        }
        Ok(records)
    }

    /// Remove every record; returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
    }

    fn setup() -> (TempDir, JsonDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = JsonDir::open(temp_dir.path().join("records")).unwrap();
        (temp_dir, dir)
    }

    fn record(name: &str) -> Record {
        Record { name: name.to_string() }
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, dir) = setup();
        dir.save("a", &record("alpha")).unwrap();

        assert_eq!(dir.load::<Record>("a").unwrap(), Some(record("alpha")));
        assert_eq!(dir.load::<Record>("missing").unwrap(), None);
    }

    #[test]
    fn test_files_are_pretty_printed() {
        let (_temp_dir, dir) = setup();
        dir.save("a", &record("alpha")).unwrap();

        let raw = fs::read_to_string(dir.path().join("a.json")).unwrap();
        assert!(raw.contains("\n  \"name\""));
    }

    #[test]
    fn test_keys_ignore_other_files() {
        let (_temp_dir, dir) = setup();
        dir.save("b", &record("beta")).unwrap();
        dir.save("a", &record("alpha")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(dir.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(dir.count().unwrap(), 2);
    }

    #[test]
    fn test_load_all_skips_corrupt() {
        let (_temp_dir, dir) = setup();
        dir.save("a", &record("alpha")).unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        let all: Vec<Record> = dir.load_all().unwrap();
        assert_eq!(all, vec![record("alpha")]);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (temp_dir, dir) = setup();
        fs::write(temp_dir.path().join("outside.json"), r#"{"name":"x"}"#).unwrap();

        for key in ["", ".", "..", "../outside", "a/b", "a\\b"] {
            let err = dir.load::<Record>(key).unwrap_err();
            assert!(matches!(
                LinksError::from_report(&err),
                Some(LinksError::Validation(ValidationError::InvalidKey(_)))
            ));
            assert!(dir.save(key, &record("x")).is_err());
            assert!(dir.remove(key).is_err());
        }
        assert!(temp_dir.path().join("outside.json").exists());
    }

    #[test]
    fn test_remove_and_clear() {
        let (_temp_dir, dir) = setup();
        dir.save("a", &record("alpha")).unwrap();
        dir.save("b", &record("beta")).unwrap();

        assert!(dir.remove("a").unwrap());
        assert!(!dir.remove("a").unwrap());
        assert_eq!(dir.clear().unwrap(), 1);
        assert_eq!(dir.count().unwrap(), 0);
    }
}
