// src/offsets.rs
//! Persisted per-source watermarks.
//!
//! A flat JSON map `source -> last processed message id` under `state/`.
//! Updates go through `set_if_greater`, which persists via a temp file and
//! an atomic rename so a crash between sources never leaves a torn file.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct OffsetStore {
    path: PathBuf,
    map: BTreeMap<String, u64>,
}

impl OffsetStore {
    /// Open the store; a missing file means no prior scan.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("parsing offsets from {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading offsets from {}", path.display()))
            }
        };
        Ok(Self { path, map })
    }

    /// Last processed id for `source`; 0 means "never scanned".
    pub fn get(&self, source: &str) -> u64 {
        self.map.get(source).copied().unwrap_or(0)
    }

    /// Commit `candidate` only if it is strictly greater than the stored
    /// watermark. Returns whether an update was persisted.
    pub fn set_if_greater(&mut self, source: &str, candidate: u64) -> Result<bool> {
        if candidate <= self.get(source) {
            return Ok(false);
        }
        self.map.insert(source.to_string(), candidate);
        self.persist()?;
        Ok(true)
    }

    /// Snapshot for the debug surface.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.map.clone()
    }

    fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating state dir {}", dir.display()))?;
            }
        }
        let tmp = tmp_path(&self.path);
        let body = serde_json::to_vec_pretty(&self.map).context("encoding offsets")?;
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = OffsetStore::open(dir.path().join("offsets.json")).unwrap();
        assert_eq!(store.get("chanA"), 0);
    }

    #[test]
    fn set_if_greater_is_monotone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.json");
        let mut store = OffsetStore::open(&path).unwrap();

        assert!(store.set_if_greater("chanA", 10).unwrap());
        assert!(!store.set_if_greater("chanA", 10).unwrap());
        assert!(!store.set_if_greater("chanA", 3).unwrap());
        assert_eq!(store.get("chanA"), 10);
        assert!(store.set_if_greater("chanA", 11).unwrap());
        assert_eq!(store.get("chanA"), 11);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("offsets.json");

        let mut store = OffsetStore::open(&path).unwrap();
        store.set_if_greater("chanA", 42).unwrap();
        store.set_if_greater("chanB", 7).unwrap();
        drop(store);

        let reopened = OffsetStore::open(&path).unwrap();
        assert_eq!(reopened.get("chanA"), 42);
        assert_eq!(reopened.get("chanB"), 7);
    }
}
