//! Reaction-role registrations.

use crate::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Persisted map from message ID to role name.
///
/// An entry is created when an admin posts a reaction-gated message and
/// consulted on every reaction add/remove. Entries never expire and are not
/// validated against the role still existing.
pub struct ReactionRoleStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl ReactionRoleStore {
    /// Load the map from disk; a missing or corrupt file starts empty.
    pub fn load(path: PathBuf) -> Self {
        let entries: HashMap<String, String> = super::load_or_default(&path);
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// Register a message as granting `role` and persist.
    pub async fn register(&self, message_id: u64, role: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(message_id.to_string(), role.to_string());
        super::persist(&self.path, &*entries)
    }

    /// Role name registered for a message, if any.
    pub async fn role_for(&self, message_id: u64) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&message_id.to_string())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReactionRoleStore::load(dir.path().join("reaction_roles.json"));

        store.register(555, "Rustaceans").await.unwrap();
        assert_eq!(store.role_for(555).await.as_deref(), Some("Rustaceans"));
        assert_eq!(store.role_for(556).await, None);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reaction_roles.json");

        let store = ReactionRoleStore::load(path.clone());
        store.register(1, "Alpha").await.unwrap();
        store.register(2, "Beta").await.unwrap();

        let reloaded = ReactionRoleStore::load(path);
        assert_eq!(reloaded.role_for(1).await.as_deref(), Some("Alpha"));
        assert_eq!(reloaded.role_for(2).await.as_deref(), Some("Beta"));
    }
}
