//! Durable key-value storage and the credential pair kept in it

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use widget_core::{AuthCredential, StoredCredential};

pub const TOKEN_KEY: &str = "chatbot_auth_token";
pub const EMAIL_KEY: &str = "chatbot_user_email";

const STORE_FILE_NAME: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// String key-value storage that survives a restart of the host.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// All keys in one JSON object on disk.
pub struct FileKeyValueStore {
    path: PathBuf,
    /// Serializes reads and read-modify-write cycles on the file.
    lock: tokio::sync::Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            path: base_path.as_ref().join(STORE_FILE_NAME),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Map to modify and write back, plus whether the file on disk was
    /// unparsable. A damaged file is replaced rather than blocking later
    /// saves or clears.
    async fn read_map_for_update(&self) -> Result<(HashMap<String, String>, bool)> {
        match self.read_map().await {
            Ok(map) => Ok((map, false)),
            Err(StorageError::Json(e)) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable store file");
                Ok((HashMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Write to a sibling temp file, then rename over the store file.
    async fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _lock = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _lock = self.lock.lock().await;
        let (mut map, _) = self.read_map_for_update().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _lock = self.lock.lock().await;
        let (mut map, damaged) = self.read_map_for_update().await?;
        if map.remove(key).is_some() || damaged {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

/// Process-local store for tests and hosts without a disk.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous peek, for assertions.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// The token/email pair mirrored into storage.
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read both keys. A read failure counts as nothing stored.
    pub async fn load(&self) -> StoredCredential {
        let token = self.read(TOKEN_KEY).await;
        let email = self.read(EMAIL_KEY).await;
        StoredCredential { token, email }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "failed to read stored credential");
                None
            }
        }
    }

    pub async fn save(&self, credential: &AuthCredential) -> Result<()> {
        self.store.set(TOKEN_KEY, &credential.token).await?;
        self.store.set(EMAIL_KEY, &credential.email).await?;
        debug!(email = %credential.email, "credential stored");
        Ok(())
    }

    pub async fn save_email(&self, email: &str) -> Result<()> {
        self.store.set(EMAIL_KEY, email).await
    }

    /// Remove both keys. Both removals are attempted even if one fails.
    pub async fn clear(&self) -> Result<()> {
        let token = self.store.remove(TOKEN_KEY).await;
        let email = self.store.remove(EMAIL_KEY).await;
        token.and(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_set_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
        store.set(TOKEN_KEY, "abc").await.unwrap();
        store.set(EMAIL_KEY, "demo@test.com").await.unwrap();
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("abc"));

        store.remove(TOKEN_KEY).await.unwrap();
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(
            store.get(EMAIL_KEY).await.unwrap().as_deref(),
            Some("demo@test.com")
        );
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        FileKeyValueStore::new(dir.path())
            .set(TOKEN_KEY, "persisted")
            .await
            .unwrap();

        let reopened = FileKeyValueStore::new(dir.path());
        assert_eq!(
            reopened.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.get(TOKEN_KEY).await, Err(StorageError::Json(_))));
    }

    #[tokio::test]
    async fn test_damaged_file_is_replaced_on_save_and_clear() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileKeyValueStore::new(dir.path()));
        let vault = CredentialVault::new(store.clone());

        // A write cut short mid-file.
        std::fs::write(store.path(), r#"{"chatbot_auth_tok"#).unwrap();
        vault.clear().await.unwrap();
        assert!(store.get(TOKEN_KEY).await.is_ok());

        std::fs::write(store.path(), r#"{"chatbot_auth_tok"#).unwrap();
        vault
            .save(&AuthCredential::new("tok", "demo@test.com"))
            .await
            .unwrap();

        let stored = vault.load().await;
        assert_eq!(stored.token.as_deref(), Some("tok"));
        assert_eq!(stored.email.as_deref(), Some("demo@test.com"));
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_vault_round_trip_and_clear() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let vault = CredentialVault::new(store.clone());

        assert!(vault.load().await.is_empty());
        vault
            .save(&AuthCredential::new("T", "demo@test.com"))
            .await
            .unwrap();
        let loaded = vault.load().await;
        assert_eq!(loaded.token.as_deref(), Some("T"));
        assert_eq!(loaded.email.as_deref(), Some("demo@test.com"));

        vault.clear().await.unwrap();
        assert!(store.snapshot().is_empty());
    }
}
