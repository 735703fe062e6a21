//! In-memory session store backed by DashMap.
//!
//! Suitable for tests and for hosts without a persistent backend. Clones
//! share the same entries, so a test can hold one handle while the session
//! manager owns another.

use crate::storage::{SessionStore, StorageResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, String>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with entries; seeding is not counted as a write.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.entries.insert(key.into(), value.into());
        }
        store
    }

    /// Number of `set` and `clear` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        for (key, value) in entries {
            self.entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn clear(&self, keys: &[&str]) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PersistedSession, StorageKeys};
    use crate::user::UserRecord;

    #[tokio::test]
    async fn test_in_memory_basic_operations() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.set(&[("token", "t1"), ("role", "employee")]).await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("t1"));
        assert_eq!(store.write_count(), 1);

        store.clear(&["token", "missing"]).await.unwrap();
        assert!(!store.contains("token"));
        assert!(store.contains("role"));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = InMemoryStore::new();
        let other = store.clone();
        other.set(&[("user", "{}")]).await.unwrap();
        assert!(store.contains("user"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_persisted_session_requires_all_entries() {
        let keys = StorageKeys::default();
        let partials = [
            vec![("user", "{}"), ("token", "t")],
            vec![("user", "{}"), ("role", "employee")],
            vec![("token", "t"), ("role", "employee")],
            vec![("user", "{}"), ("token", ""), ("role", "employee")],
        ];
        for entries in partials {
            let store = InMemoryStore::with_entries(entries);
            assert_eq!(PersistedSession::load(&store, &keys).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_persisted_session_save_and_load() {
        let keys = StorageKeys::default();
        let store = InMemoryStore::new();
        let user = UserRecord::from_email("a@x.com").with_role("employee");

        PersistedSession::save(&store, &keys, &user, "t1", "employee")
            .await
            .unwrap();
        assert_eq!(store.write_count(), 1);

        let loaded = PersistedSession::load(&store, &keys).await.unwrap().unwrap();
        assert_eq!(loaded.token, "t1");
        assert_eq!(loaded.role, "employee");
        assert_eq!(loaded.parse_user(&keys.user).unwrap(), user);
    }
}
