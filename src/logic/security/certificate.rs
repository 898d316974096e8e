//! Score certificate payload
//!
//! The payload is serialized once to its canonical JSON form; those exact bytes
//! are signed and handed to the caller. Verification always works on the bytes
//! received, never on a re-serialization.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::SecurityError;

/// Certificate lifetime in seconds
pub const CERTIFICATE_TTL_SECS: i64 = 86_400;

/// Field order is the canonical serialization order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificatePayload {
    pub score: f64,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Anonymised subject id
    pub uid: String,
    pub tampered: bool,
}

impl CertificatePayload {
    pub fn new(score: f64, uid: impl Into<String>, now: i64) -> Result<Self, SecurityError> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(SecurityError::InvalidScore(score));
        }

        let exp = now
            .checked_add(CERTIFICATE_TTL_SECS)
            .ok_or(SecurityError::InvalidTimestamp(now))?;

        Ok(Self {
            score,
            iat: now,
            exp,
            uid: uid.into(),
            tampered: false,
        })
    }

    pub fn to_canonical_json(&self) -> Result<String, SecurityError> {
        serde_json::to_string(self).map_err(|e| SecurityError::Serialization(e.to_string()))
    }

    pub fn from_json(payload: &str) -> Result<Self, SecurityError> {
        serde_json::from_str(payload).map_err(|e| SecurityError::Serialization(e.to_string()))
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// What the caller receives: the exact signed bytes, the signature and the key to check it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCertificate {
    pub payload: String,
    /// Base64 Ed25519 signature over `payload`
    pub signature: String,
    /// Base64 Ed25519 public key
    pub public_key: String,
}

/// SHA-256 hex of `salt || raw_id`
pub fn anonymize_subject(salt: &str, raw_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(raw_id.as_bytes());
    hex::encode(hasher.finalize())
}
