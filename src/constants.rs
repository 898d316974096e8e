//! Central Configuration Constants
//!
//! Single source of truth for configuration defaults and the environment
//! variables that override them.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Borehole";

/// Directory under the platform data dir
pub const APP_DIR_NAME: &str = "borehole";

/// Signing key file name inside `APP_DIR_NAME`
pub const KEY_FILE_NAME: &str = "signing_key.json";

/// Default salt for subject anonymisation
pub const DEFAULT_SUBJECT_SALT: &str = "borehole-subject-v1";

// ============================================
// Environment variable names
// ============================================

pub const ENV_KEY_STORE: &str = "BOREHOLE_KEY_STORE";
pub const ENV_KEY_PATH: &str = "BOREHOLE_KEY_PATH";
pub const ENV_MODEL_PATH: &str = "BOREHOLE_MODEL_PATH";
pub const ENV_MODEL_SHA256: &str = "BOREHOLE_MODEL_SHA256";
pub const ENV_SUBJECT_SALT: &str = "BOREHOLE_SUBJECT_SALT";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Non-empty env var value
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Get subject salt from environment or use default
pub fn get_subject_salt() -> String {
    env_non_empty(ENV_SUBJECT_SALT).unwrap_or_else(|| DEFAULT_SUBJECT_SALT.to_string())
}
