//! # API-Key Authentication
//!
//! Key issuance, hashed storage, and role-scoped verification.
//!
//! ## Threat Model
//!
//! - **Key-store disclosure**: only `SHA-256(plaintext)` is persisted; the
//!   plaintext is returned exactly once at issuance and never written
//!   anywhere. A stolen key file cannot be replayed against the API.
//!
//! - **Revocation gaps**: the metadata cache lives at most 60 seconds, so
//!   a revoked key stops validating within one TTL.
//!
//! - **Privilege creep**: roles carry a fixed permission matrix; handlers
//!   gate on roles, never on ad-hoc flags.
//!
//! The YAML file is the persistent truth; every mutation rewrites it under
//! the store's exclusive lock and invalidates the cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

/// How long loaded key metadata may be reused before re-reading the file.
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors raised by the key store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Key file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key file is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Access-control role. The permission matrix is fixed:
///
/// | Role | Permissions |
/// |------|-------------|
/// | `admin` | all read + all write + `admin:keys` + `admin:users` |
/// | `operator` | all read + `write:captures`, `write:templates` |
/// | `readonly` | all read |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including key management.
    Admin,
    /// Read everything, write captures and templates.
    Operator,
    /// Read everything, write nothing.
    Readonly,
}

const READ_PERMISSIONS: [&str; 5] = [
    "read:status",
    "read:logs",
    "read:templates",
    "read:captures",
    "read:dashboard",
];

impl Role {
    /// Parses a lowercase role name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "readonly" => Some(Self::Readonly),
            _ => None,
        }
    }

    /// The role's name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::Readonly => "readonly",
        }
    }

    /// Every permission this role holds.
    pub fn permissions(&self) -> Vec<&'static str> {
        let mut perms: Vec<&'static str> = READ_PERMISSIONS.to_vec();
        match self {
            Self::Admin => {
                perms.extend(["write:captures", "write:templates", "write:config"]);
                perms.extend(["admin:keys", "admin:users"]);
            }
            Self::Operator => {
                perms.extend(["write:captures", "write:templates"]);
            }
            Self::Readonly => {}
        }
        perms
    }

    /// Whether this role holds a specific permission.
    pub fn can(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted metadata for one key. The plaintext never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key identifier (e.g. "service-bot", "operator-alice").
    pub name: String,

    /// Access-control role.
    pub role: Role,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Issuance time, RFC 3339.
    pub created_at: String,

    /// Last successful validation, RFC 3339.
    #[serde(default)]
    pub last_used: Option<String>,

    /// Number of successful validations.
    #[serde(default)]
    pub use_count: u64,
}

/// A key record as exposed by the listing endpoint: the hash truncated,
/// the plaintext never present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedKey {
    /// First 16 hex chars of the key hash.
    pub key_hash: String,
    /// The stored metadata.
    #[serde(flatten)]
    pub record: KeyRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default)]
    keys: BTreeMap<String, KeyRecord>,
}

#[derive(Debug)]
struct CacheState {
    file: KeyFile,
    loaded_at: Instant,
}

/// YAML-backed API-key store with a short-lived metadata cache.
#[derive(Debug)]
pub struct ApiKeyStore {
    path: PathBuf,
    cache: Mutex<Option<CacheState>>,
}

impl ApiKeyStore {
    /// Creates a store backed by `path`. The file is created lazily on the
    /// first mutation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 hex of a plaintext key: the storage key.
    pub fn hash_key(plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generates fresh 256-bit URL-safe key material.
    pub fn generate_key() -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issues a new key and returns the plaintext - the only time it is
    /// ever available.
    pub fn create_key(
        &self,
        name: &str,
        role: Role,
        description: &str,
    ) -> Result<String, AuthError> {
        let plaintext = Self::generate_key();
        let key_hash = Self::hash_key(&plaintext);

        let mut guard = self.lock();
        let mut file = self.load(&mut guard)?;
        file.keys.insert(
            key_hash,
            KeyRecord {
                name: name.to_string(),
                role,
                description: description.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
                last_used: None,
                use_count: 0,
            },
        );
        self.save(&mut guard, file)?;

        info!(name, role = %role, "API key created");
        Ok(plaintext)
    }

    /// Validates a plaintext key. On success, bumps `last_used` and
    /// `use_count` and returns the metadata; unknown keys return `None`.
    pub fn validate(&self, plaintext: &str) -> Result<Option<KeyRecord>, AuthError> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let key_hash = Self::hash_key(plaintext);

        let mut guard = self.lock();
        let mut file = self.load(&mut guard)?;

        let record = match file.keys.get_mut(&key_hash) {
            None => return Ok(None),
            Some(record) => {
                record.last_used = Some(chrono::Utc::now().to_rfc3339());
                record.use_count += 1;
                record.clone()
            }
        };

        self.save(&mut guard, file)?;
        Ok(Some(record))
    }

    /// Revokes a key. Returns whether a record was removed. Historical log
    /// entries citing the hash remain untouched and verifiable.
    pub fn revoke(&self, plaintext: &str) -> Result<bool, AuthError> {
        let key_hash = Self::hash_key(plaintext);

        let mut guard = self.lock();
        let mut file = self.load(&mut guard)?;
        let removed = file.keys.remove(&key_hash).is_some();
        if removed {
            self.save(&mut guard, file)?;
            info!("API key revoked");
        }
        Ok(removed)
    }

    /// Lists every record with its hash truncated to 16 chars.
    pub fn list_keys(&self) -> Result<Vec<RedactedKey>, AuthError> {
        let mut guard = self.lock();
        let file = self.load(&mut guard)?;

        Ok(file
            .keys
            .into_iter()
            .map(|(hash, record)| RedactedKey {
                key_hash: format!("{}...", &hash[..16.min(hash.len())]),
                record,
            })
            .collect())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CacheState>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(
        &self,
        guard: &mut std::sync::MutexGuard<'_, Option<CacheState>>,
    ) -> Result<KeyFile, AuthError> {
        if let Some(cached) = guard.as_ref() {
            if cached.loaded_at.elapsed() < CACHE_TTL {
                return Ok(cached.file.clone());
            }
        }

        let file = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)?;
            serde_yaml::from_str(&text).unwrap_or_default()
        } else {
            KeyFile::default()
        };

        **guard = Some(CacheState {
            file: file.clone(),
            loaded_at: Instant::now(),
        });
        Ok(file)
    }

    fn save(
        &self,
        guard: &mut std::sync::MutexGuard<'_, Option<CacheState>>,
        file: KeyFile,
    ) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.path, serde_yaml::to_string(&file)?)?;

        **guard = Some(CacheState {
            file,
            loaded_at: Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ApiKeyStore {
        ApiKeyStore::new(dir.path().join("api_keys.yaml"))
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.can("admin:keys"));
        assert!(Role::Operator.can("write:captures"));
        assert!(!Role::Operator.can("admin:keys"));
        assert!(Role::Readonly.can("read:logs"));
        assert!(!Role::Readonly.can("write:captures"));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_generated_keys_are_unique_and_urlsafe() {
        let a = ApiKeyStore::generate_key();
        let b = ApiKeyStore::generate_key();
        assert_ne!(a, b);
        // 32 bytes of entropy encode to 43 URL-safe chars without padding.
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }

    #[test]
    fn test_create_and_validate() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let key = store.create_key("bot", Role::Operator, "ci bot").unwrap();
        let record = store.validate(&key).unwrap().unwrap();

        assert_eq!(record.name, "bot");
        assert_eq!(record.role, Role::Operator);
        assert_eq!(record.use_count, 1);
        assert!(record.last_used.is_some());
    }

    #[test]
    fn test_use_count_accumulates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let key = store.create_key("bot", Role::Readonly, "").unwrap();
        store.validate(&key).unwrap();
        store.validate(&key).unwrap();
        let record = store.validate(&key).unwrap().unwrap();

        assert_eq!(record.use_count, 3);
    }

    #[test]
    fn test_plaintext_never_persisted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let key = store.create_key("bot", Role::Admin, "").unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();

        assert!(!content.contains(&key));
        assert!(content.contains(&ApiKeyStore::hash_key(&key)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.validate("not-a-key").unwrap().is_none());
        assert!(store.validate("").unwrap().is_none());
    }

    #[test]
    fn test_revocation() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let key = store.create_key("temp", Role::Readonly, "").unwrap();
        assert!(store.validate(&key).unwrap().is_some());

        assert!(store.revoke(&key).unwrap());
        assert!(store.validate(&key).unwrap().is_none());
        assert!(!store.revoke(&key).unwrap());
    }

    #[test]
    fn test_list_keys_redacts_hashes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.create_key("a", Role::Admin, "first").unwrap();
        store.create_key("b", Role::Readonly, "second").unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(keys.len(), 2);
        for key in keys {
            assert!(key.key_hash.ends_with("..."));
            assert_eq!(key.key_hash.len(), 19);
        }
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let key = {
            let store = store(&dir);
            store.create_key("persisted", Role::Operator, "").unwrap()
        };

        let reopened = store(&dir);
        let record = reopened.validate(&key).unwrap().unwrap();
        assert_eq!(record.name, "persisted");
    }
}
