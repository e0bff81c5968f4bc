//! Multi-provider credential storage
//!
//! OAuth credentials per provider in one JSON file. Writes go to a sibling
//! temp file first and are renamed into place, so a crash mid-write leaves
//! the previous file intact.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::auth::{Credential, CredentialPersistence};

/// Credentials indexed by provider id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(flatten)]
    credentials: BTreeMap<String, Credential>,
}

impl CredentialStore {
    /// Load credentials; a missing file is an empty store
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let store: CredentialStore = serde_json::from_str(&contents)
            .with_context(|| format!("Corrupt credentials file {}", path.display()))?;
        Ok(store)
    }

    /// Durably write the store, readable only by the owner on Unix
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        {
            use std::io::Write;
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;

            // Set restrictive permissions before any secret hits the disk
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }

            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move credentials into {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, provider_id: &str) -> Option<&Credential> {
        self.credentials.get(provider_id)
    }

    pub fn set(&mut self, provider_id: impl Into<String>, credential: Credential) {
        self.credentials.insert(provider_id.into(), credential);
    }

    pub fn remove(&mut self, provider_id: &str) -> Option<Credential> {
        self.credentials.remove(provider_id)
    }

    pub fn providers(&self) -> impl Iterator<Item = (&str, &Credential)> {
        self.credentials.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// File-backed credential persistence.
///
/// Read-modify-write of the store is serialized so concurrent refreshes for
/// different providers don't clobber each other.
pub struct FileCredentials {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Result<CredentialStore> {
        let _guard = self.lock.lock();
        CredentialStore::load_from_path(&self.path)
    }
}

impl CredentialPersistence for FileCredentials {
    fn load(&self, provider_id: &str) -> Result<Option<Credential>> {
        Ok(self.load_all()?.get(provider_id).cloned())
    }

    fn persist(&self, provider_id: &str, credential: &Credential) -> Result<()> {
        let _guard = self.lock.lock();
        let mut store = CredentialStore::load_from_path(&self.path)?;
        store.set(provider_id, credential.clone());
        store.save_to_path(&self.path)?;
        tracing::info!(provider = provider_id, "Credential persisted");
        Ok(())
    }
}
