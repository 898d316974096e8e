//! Key Storage - Ed25519 seed persistence
//!
//! `FileKeyStore` keeps the 32-byte seed in a small JSON file, created on first
//! use. A file that exists but cannot be read back is an error; it is never
//! replaced with a fresh key.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

const KEY_FILE_FORMAT_VERSION: u32 = 1;
const KEY_ALGORITHM: &str = "ed25519";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("key file I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt key file {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

// ============================================================================
// TRAIT
// ============================================================================

/// Source of the signing key
pub trait KeyStore: Send + Sync {
    /// Return the stored key, generating and storing one on first use
    fn load_or_create(&self) -> Result<SigningKey, KeyStoreError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

fn generate_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    seed
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Process-lifetime key. Every module built from the same store shares it.
#[derive(Default)]
pub struct MemoryKeyStore {
    seed: Mutex<Option<[u8; 32]>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed seed, for deterministic tests
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            seed: Mutex::new(Some(seed)),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_or_create(&self) -> Result<SigningKey, KeyStoreError> {
        let mut slot = self.seed.lock();
        let seed = *slot.get_or_insert_with(generate_seed);
        Ok(SigningKey::from_bytes(&seed))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// On-disk key file format
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    format_version: u32,
    algorithm: String,
    /// Hex-encoded 32-byte seed
    seed: String,
    /// Base64 public key, cross-checked on load
    public_key: String,
    created_at: DateTime<Utc>,
}

pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/borehole/signing_key.json`
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::constants::APP_DIR_NAME)
            .join(crate::constants::KEY_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_string(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, source: std::io::Error) -> KeyStoreError {
        KeyStoreError::Io {
            path: self.path_string(),
            source,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> KeyStoreError {
        KeyStoreError::Corrupt {
            path: self.path_string(),
            reason: reason.into(),
        }
    }

    fn load(&self) -> Result<SigningKey, KeyStoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;

        let file: KeyFile =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;

        if file.format_version != KEY_FILE_FORMAT_VERSION {
            return Err(self.corrupt(format!("unsupported format version {}", file.format_version)));
        }
        if file.algorithm != KEY_ALGORITHM {
            return Err(self.corrupt(format!("unsupported algorithm {}", file.algorithm)));
        }

        let seed: [u8; 32] = hex::decode(&file.seed)
            .map_err(|e| self.corrupt(format!("seed is not hex: {e}")))?
            .try_into()
            .map_err(|_| self.corrupt("seed must be 32 bytes"))?;

        let key = SigningKey::from_bytes(&seed);
        if BASE64.encode(key.verifying_key().as_bytes()) != file.public_key {
            return Err(self.corrupt("public key does not match seed"));
        }

        log::debug!("Signing key loaded from {}", self.path.display());
        Ok(key)
    }

    fn create(&self) -> Result<SigningKey, KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let key = SigningKey::from_bytes(&generate_seed());
        let file = KeyFile {
            format_version: KEY_FILE_FORMAT_VERSION,
            algorithm: KEY_ALGORITHM.to_string(),
            seed: hex::encode(key.to_bytes()),
            public_key: BASE64.encode(key.verifying_key().as_bytes()),
            created_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| self.corrupt(e.to_string()))?;

        // Written beside the target, then linked in without clobbering:
        // readers only ever see a complete file
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                log::info!("New signing key created at {}", self.path.display());
                Ok(key)
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                log::debug!("Signing key created concurrently at {}, loading it", self.path.display());
                self.load()
            }
            Err(e) => Err(self.io_error(e.error)),
        }
    }
}

impl KeyStore for FileKeyStore {
    fn load_or_create(&self) -> Result<SigningKey, KeyStoreError> {
        if self.path.exists() {
            self.load()
        } else {
            self.create()
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_stable() {
        let store = MemoryKeyStore::new();
        let a = store.load_or_create().unwrap();
        let b = store.load_or_create().unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_memory_store_with_seed() {
        let store = MemoryKeyStore::with_seed([7u8; 32]);
        let key = store.load_or_create().unwrap();
        assert_eq!(key.to_bytes(), [7u8; 32]);
    }

    #[test]
    fn test_file_store_creates_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("signing_key.json");

        let first = FileKeyStore::new(&path).load_or_create().unwrap();
        assert!(path.exists());

        let second = FileKeyStore::new(&path).load_or_create().unwrap();
        assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[test]
    fn test_create_race_loads_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.json");

        // Another process wrote the key after this one saw no file
        let winner = FileKeyStore::new(&path).load_or_create().unwrap();
        let written = fs::read_to_string(&path).unwrap();

        let loser = FileKeyStore::new(&path).create().unwrap();
        assert_eq!(winner.to_bytes(), loser.to_bytes());
        assert_eq!(fs::read_to_string(&path).unwrap(), written);

        // No temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_create_race_with_corrupt_winner_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.json");
        fs::write(&path, "{").unwrap();

        let err = FileKeyStore::new(&path).create().unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.json");
        FileKeyStore::new(&path).load_or_create().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.json");
        fs::write(&path, "not json").unwrap();

        let err = FileKeyStore::new(&path).load_or_create().unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt { .. }));
        // Never overwritten
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn test_mismatched_public_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing_key.json");
        FileKeyStore::new(&path).load_or_create().unwrap();

        let mut file: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        file["public_key"] = serde_json::Value::String(BASE64.encode([0u8; 32]));
        fs::write(&path, file.to_string()).unwrap();

        assert!(matches!(
            FileKeyStore::new(&path).load_or_create(),
            Err(KeyStoreError::Corrupt { .. })
        ));
    }
}
