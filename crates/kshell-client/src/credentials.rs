//! Saved connections: labeled host and credential sets on disk.
//!
//! The store is a single JSON file under the platform configuration
//! directory, `<config>/kshell/connections.json`. Passwords are stored in
//! the clear; the file is only as private as the account that owns it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CredentialStoreError;

/// One saved connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    /// Short name the user refers to this connection by.
    pub label: String,
    /// Device host name or address.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// Account name.
    pub user: String,
    /// Account password.
    pub password: String,
    /// When this connection was last used.
    pub last_used: DateTime<Utc>,
}

/// On-disk store of saved connections.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at the platform default location.
    pub fn open_default() -> Result<CredentialStore, CredentialStoreError> {
        let dir = dirs::config_dir().ok_or(CredentialStoreError::NoConfigDir)?;
        Ok(CredentialStore::at_path(
            dir.join("kshell").join("connections.json"),
        ))
    }

    /// Store backed by an explicit file.
    pub fn at_path(path: impl Into<PathBuf>) -> CredentialStore {
        CredentialStore { path: path.into() }
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved connections, most recently used first.
    ///
    /// A missing file is an empty store, not an error.
    pub fn load(&self) -> Result<Vec<StoredConnection>, CredentialStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut connections: Vec<StoredConnection> = serde_json::from_str(&text)?;
        connections.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(connections)
    }

    /// Insert or refresh a connection, stamping its last-used time.
    ///
    /// Entries match when label, host, port and user all agree; a matching
    /// entry has its password replaced in place.
    pub fn update(&self, connection: &StoredConnection) -> Result<(), CredentialStoreError> {
        let mut connections = self.load()?;
        let stamped = StoredConnection {
            last_used: Utc::now(),
            ..connection.clone()
        };

        let slot = connections.iter_mut().find(|existing| {
            existing.label == stamped.label
                && existing.host == stamped.host
                && existing.port == stamped.port
                && existing.user == stamped.user
        });
        match slot {
            Some(existing) => *existing = stamped,
            None => connections.push(stamped),
        }
        self.save(&connections)
    }

    /// Remove every entry with the given label. Returns how many went away.
    pub fn remove(&self, label: &str) -> Result<usize, CredentialStoreError> {
        let mut connections = self.load()?;
        let before = connections.len();
        connections.retain(|connection| connection.label != label);
        let removed = before - connections.len();
        if removed > 0 {
            self.save(&connections)?;
        }
        Ok(removed)
    }

    /// Most recently used entry for a host and port.
    pub fn find(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<StoredConnection>, CredentialStoreError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|connection| connection.host == host && connection.port == port))
    }

    /// Entry with the given label, if any.
    pub fn find_label(&self, label: &str) -> Result<Option<StoredConnection>, CredentialStoreError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|connection| connection.label == label))
    }

    fn save(&self, connections: &[StoredConnection]) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(connections)?;
        fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), entries = connections.len(), "store written");
        Ok(())
    }
}
