// SPDX-License-Identifier: GPL-3.0-only

//! Key/value preference stores

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Persistent string preferences
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.values.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// JSON file store
///
/// The whole map is rewritten on every change. A corrupt file is treated as
/// empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Mutex::new(None),
        }
    }

    /// `<data dir>/snapshoot/preferences.json`
    pub fn default_location() -> AppResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| AppError::Storage("No data directory".to_string()))?;
        Ok(Self::new(
            dir.join(crate::constants::app_info::APP_NAME)
                .join("preferences.json"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> AppResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => Ok(values),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Corrupt preferences, starting empty");
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(values)?).await?;
        debug!(path = %self.path.display(), keys = values.len(), "Preferences written");
        Ok(())
    }

    /// Run `f` on the loaded map, writing it back if `f` says it changed
    async fn update<F>(&self, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool + Send,
    {
        let mut guard = self.values.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        if let Some(values) = guard.as_mut()
            && f(values)
        {
            self.write_file(values).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SecureStore for FileStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut guard = self.values.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard.as_ref().and_then(|values| values.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.update(|values| values.remove(key).is_some()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("snapshoot-prefs-{}", uuid::Uuid::new_v4()))
            .join("preferences.json")
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let path = temp_path();
        {
            let store = FileStore::new(&path);
            store.set("authToken", "t").await.unwrap();
            store.set("currentUser", "{}").await.unwrap();
            store.remove("currentUser").await.unwrap();
        }

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("authToken").await.unwrap().as_deref(), Some("t"));
        assert_eq!(reopened.get("currentUser").await.unwrap(), None);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let path = temp_path();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.unwrap();
        }
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("authToken").await.unwrap(), None);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
