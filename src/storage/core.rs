//! The session store port and the persisted session triple.

use crate::errors::StorageError;
use crate::user::UserRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistent string key/value storage that survives restarts.
///
/// Only the session manager writes through this trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a single entry.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write all entries as one batch.
    async fn set(&self, entries: &[(&str, &str)]) -> StorageResult<()>;

    /// Remove entries; missing keys are ignored.
    async fn clear(&self, keys: &[&str]) -> StorageResult<()>;
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        (**self).set(entries).await
    }

    async fn clear(&self, keys: &[&str]) -> StorageResult<()> {
        (**self).clear(keys).await
    }
}

/// Names of the three persisted entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    pub user: String,
    pub token: String,
    pub role: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            user: "user".to_string(),
            token: "token".to_string(),
            role: "role".to_string(),
        }
    }
}

impl StorageKeys {
    pub fn all(&self) -> [&str; 3] {
        [&self.user, &self.token, &self.role]
    }
}

/// The `user`/`token`/`role` triple as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub user: String,
    pub token: String,
    pub role: String,
}

impl PersistedSession {
    /// Reads the triple; any missing or empty entry means no session.
    pub async fn load<S>(store: &S, keys: &StorageKeys) -> StorageResult<Option<Self>>
    where
        S: SessionStore + ?Sized,
    {
        let user = store.get(&keys.user).await?;
        let token = store.get(&keys.token).await?;
        let role = store.get(&keys.role).await?;

        match (user, token, role) {
            (Some(user), Some(token), Some(role))
                if !user.is_empty() && !token.is_empty() && !role.is_empty() =>
            {
                Ok(Some(Self { user, token, role }))
            }
            (user, token, role) => {
                if user.is_some() || token.is_some() || role.is_some() {
                    tracing::warn!(
                        has_user = user.is_some(),
                        has_token = token.is_some(),
                        has_role = role.is_some(),
                        "Partial persisted session, treating as signed out"
                    );
                }
                Ok(None)
            }
        }
    }

    /// Writes user, token and role in one batch.
    pub async fn save<S>(
        store: &S,
        keys: &StorageKeys,
        user: &UserRecord,
        token: &str,
        role: &str,
    ) -> StorageResult<()>
    where
        S: SessionStore + ?Sized,
    {
        let user_json = serialize_user(user)?;
        store
            .set(&[
                (keys.user.as_str(), user_json.as_str()),
                (keys.token.as_str(), token),
                (keys.role.as_str(), role),
            ])
            .await
    }

    pub fn parse_user(&self, key: &str) -> StorageResult<UserRecord> {
        serde_json::from_str(&self.user).map_err(|e| StorageError::corrupted(key, e.to_string()))
    }
}

pub(crate) fn serialize_user(user: &UserRecord) -> StorageResult<String> {
    serde_json::to_string(user).map_err(|e| StorageError::serialization(e.to_string()))
}
