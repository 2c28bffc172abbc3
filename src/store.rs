//! Flat-file JSON persistence.
//!
//! Two tiny stores back the whole bot: the DM opt-in set and the
//! reaction-role map. Both rewrite their file on every mutation;
//! last-write-wins, no transactions. The rest of the system talks to the
//! store types, not the files, so the storage mechanism can be swapped
//! without touching call sites.

pub mod optin;
pub mod reaction_roles;

pub use optin::OptInStore;
pub use reaction_roles::ReactionRoleStore;

use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Read a JSON document, treating a missing file as the default value and
/// corrupt content as the default value after a warning. Readers never fail
/// hard on a bad store file.
pub(crate) fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "failed to read store file");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "corrupt store file, starting empty");
            T::default()
        }
    }
}

/// Rewrite the whole document.
pub(crate) fn persist<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    std::fs::write(path, raw).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source: Arc::new(source),
    })
}
