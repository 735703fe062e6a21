//! File-backed session store.
//!
//! Entries live in a single JSON object on disk. Every read goes to the
//! file, so a second process sees the latest write. Writes go to a sibling
//! temporary file that is renamed over the original, so a batch lands whole
//! or not at all.
//!
//! ```json
//! {
//!   "role": "employee",
//!   "token": "eyJhbGciOi...",
//!   "user": "{\"_id\":\"e1\",\"role\":\"employee\"}"
//! }
//! ```

use crate::errors::StorageError;
use crate::storage::{SessionStore, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Entries = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Default location: `<data dir>/hr-session/session.json`.
    pub fn default_path() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("hr-session").join("session.json")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".hr-session").join("session.json")
        } else {
            PathBuf::from(".hr-session").join("session.json")
        }
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> StorageResult<Entries> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&contents)
            .map_err(|e| StorageError::corrupted(self.path.display().to_string(), e.to_string()))
    }

    /// Current entries for a write; a corrupted file is replaced rather than kept.
    async fn entries_for_write(&self) -> StorageResult<Entries> {
        match self.read_entries().await {
            Err(StorageError::Corrupted { message, .. }) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %message,
                    "Overwriting corrupted session file"
                );
                Ok(Entries::new())
            }
            other => other,
        }
    }

    async fn write_entries(&self, entries: &Entries) -> StorageResult<()> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;

        // Owner read/write only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut current = self.entries_for_write().await?;
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.write_entries(&current).await
    }

    async fn clear(&self, keys: &[&str]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut current = self.entries_for_write().await?;
        let before = current.len();
        for key in keys {
            current.remove(*key);
        }
        if current.len() == before {
            return Ok(());
        }
        self.write_entries(&current).await
    }
}
