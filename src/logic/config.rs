//! Engine configuration from environment variables

use std::path::PathBuf;

use crate::constants::{
    env_non_empty, get_subject_salt, ENV_KEY_PATH, ENV_KEY_STORE, ENV_MODEL_PATH, ENV_MODEL_SHA256,
};
use crate::logic::model::ModelSource;
use crate::logic::security::{FileKeyStore, KeyStore, MemoryKeyStore};

/// Where the signing key lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreKind {
    File(PathBuf),
    Memory,
}

impl KeyStoreKind {
    pub fn build(&self) -> Box<dyn KeyStore> {
        match self {
            KeyStoreKind::File(path) => Box::new(FileKeyStore::new(path.clone())),
            KeyStoreKind::Memory => {
                log::warn!("Using in-memory signing key; certificates will not verify after restart");
                Box::new(MemoryKeyStore::new())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub key_store: KeyStoreKind,
    pub model_source: ModelSource,
    /// Expected hex SHA-256 of the model resource
    pub model_sha256: Option<String>,
    pub subject_salt: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_store: KeyStoreKind::File(FileKeyStore::default_path()),
            model_source: ModelSource::Embedded,
            model_sha256: None,
            subject_salt: get_subject_salt(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let key_path = env_non_empty(ENV_KEY_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(FileKeyStore::default_path);

        let key_store = match env_non_empty(ENV_KEY_STORE).map(|s| s.to_lowercase()).as_deref() {
            Some("memory") => KeyStoreKind::Memory,
            Some("file") | None => KeyStoreKind::File(key_path),
            Some(other) => {
                log::warn!("Unknown {}='{}', using file key store", ENV_KEY_STORE, other);
                KeyStoreKind::File(key_path)
            }
        };

        let model_source = env_non_empty(ENV_MODEL_PATH)
            .map(|p| ModelSource::File(PathBuf::from(p)))
            .unwrap_or(ModelSource::Embedded);

        Self {
            key_store,
            model_source,
            model_sha256: env_non_empty(ENV_MODEL_SHA256),
            subject_salt: get_subject_salt(),
        }
    }

    /// In-memory key, embedded model. For tests and one-shot runs.
    pub fn ephemeral() -> Self {
        Self {
            key_store: KeyStoreKind::Memory,
            ..Self::default()
        }
    }
}
