//! DM broadcast opt-in set.

use crate::error::StoreError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Persisted set of user IDs consenting to DM broadcasts.
///
/// Serialized as a plain JSON array of opaque ID strings. Every mutation
/// rewrites the file under the store's own lock.
pub struct OptInStore {
    path: PathBuf,
    users: RwLock<BTreeSet<String>>,
}

impl OptInStore {
    /// Load the set from disk; a missing or corrupt file starts empty.
    pub fn load(path: PathBuf) -> Self {
        let users: Vec<String> = super::load_or_default(&path);
        Self {
            path,
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    /// Add a user. Returns false when the user was already opted in;
    /// the set (and file) are unchanged in that case.
    pub async fn opt_in(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if !users.insert(user_id.to_string()) {
            return Ok(false);
        }
        self.persist(&users)?;
        Ok(true)
    }

    /// Remove a user. Returns false when the user was not opted in.
    pub async fn opt_out(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if !users.remove(user_id) {
            return Ok(false);
        }
        self.persist(&users)?;
        Ok(true)
    }

    /// Drop a user without signalling absence (used when a broadcast DM
    /// bounces off privacy settings).
    pub async fn discard(&self, user_id: &str) {
        let mut users = self.users.write().await;
        if users.remove(user_id) {
            if let Err(error) = self.persist(&users) {
                tracing::warn!(%error, "failed to persist opt-in set after discard");
            }
        }
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.users.read().await.contains(user_id)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Copy of the current membership, for iteration outside the lock.
    pub async fn snapshot(&self) -> Vec<String> {
        self.users.read().await.iter().cloned().collect()
    }

    fn persist(&self, users: &BTreeSet<String>) -> Result<(), StoreError> {
        let list: Vec<&String> = users.iter().collect();
        super::persist(&self.path, &list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> OptInStore {
        OptInStore::load(dir.path().join("dm_optin.json"))
    }

    #[tokio::test]
    async fn opt_in_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.opt_in("1001").await.unwrap());
        assert_eq!(store.len().await, 1);

        // Second opt-in leaves the set unchanged and signals "already in".
        assert!(!store.opt_in("1001").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn opt_out_of_absent_user_signals_not_opted_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(!store.opt_out("1001").await.unwrap());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn optin_optin_optout_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.opt_in("42").await.unwrap();
        assert!(store.contains("42").await);

        store.opt_in("42").await.unwrap();
        assert_eq!(store.len().await, 1);

        assert!(store.opt_out("42").await.unwrap());
        assert!(!store.contains("42").await);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dm_optin.json");

        let store = OptInStore::load(path.clone());
        store.opt_in("7").await.unwrap();
        store.opt_in("3").await.unwrap();
        store.opt_in("11").await.unwrap();

        let reloaded = OptInStore::load(path);
        let mut snapshot = reloaded.snapshot().await;
        snapshot.sort();
        assert_eq!(snapshot, vec!["11", "3", "7"]);
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dm_optin.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = OptInStore::load(path);
        assert!(store.is_empty().await);
    }
}
