//! Security Module - Signed score certificates
//!
//! Ed25519 signing of certificate payloads. The key is resolved once from a
//! `KeyStore` at construction and never changes afterwards, so the signing
//! and verification paths take no locks.

pub mod certificate;
pub mod keystore;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub use certificate::{anonymize_subject, CertificatePayload, SignedCertificate, CERTIFICATE_TTL_SECS};
pub use keystore::{FileKeyStore, KeyStore, KeyStoreError, MemoryKeyStore};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SecurityError {
    #[error("score {0} is outside [0, 1]")]
    InvalidScore(f64),

    #[error("issue time {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("certificate serialization failed: {0}")]
    Serialization(String),

    #[error("signature is not valid base64: {0}")]
    InvalidSignatureEncoding(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

// ============================================================================
// SECURITY MODULE
// ============================================================================

pub struct SecurityModule {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    public_key_b64: String,
}

impl SecurityModule {
    pub fn new(store: &dyn KeyStore) -> Result<Self, KeyStoreError> {
        let signing_key = store.load_or_create()?;
        let verifying_key = signing_key.verifying_key();
        let public_key_b64 = BASE64.encode(verifying_key.as_bytes());

        log::info!("Signing key ready ({})", store.describe());

        Ok(Self {
            signing_key,
            verifying_key,
            public_key_b64,
        })
    }

    pub fn public_key_base64(&self) -> &str {
        &self.public_key_b64
    }

    /// Sign a certificate issued now
    pub fn issue_certificate(&self, score: f64, subject_id: &str) -> Result<SignedCertificate, SecurityError> {
        self.issue_certificate_at(score, subject_id, chrono::Utc::now().timestamp())
    }

    pub fn issue_certificate_at(
        &self,
        score: f64,
        subject_id: &str,
        now: i64,
    ) -> Result<SignedCertificate, SecurityError> {
        let payload = CertificatePayload::new(score, subject_id, now)?.to_canonical_json()?;
        let signature = self.signing_key.sign(payload.as_bytes());

        Ok(SignedCertificate {
            payload,
            signature: BASE64.encode(signature.to_bytes()),
            public_key: self.public_key_b64.clone(),
        })
    }

    /// Check `signature_b64` over the exact `payload` bytes with this module's key.
    /// Only an undecodable signature is an error; anything else that fails is `Ok(false)`.
    pub fn verify_certificate(&self, payload: &str, signature_b64: &str) -> Result<bool, SecurityError> {
        verify_with_key(&self.verifying_key, payload, signature_b64)
    }
}

/// Verification for holders of only the public key
pub fn verify_with_public_key(
    public_key_b64: &str,
    payload: &str,
    signature_b64: &str,
) -> Result<bool, SecurityError> {
    let bytes: [u8; 32] = BASE64
        .decode(public_key_b64.trim())
        .map_err(|e| SecurityError::InvalidPublicKey(e.to_string()))?
        .try_into()
        .map_err(|_| SecurityError::InvalidPublicKey("expected 32 bytes".to_string()))?;

    let key = VerifyingKey::from_bytes(&bytes)
        .map_err(|e| SecurityError::InvalidPublicKey(e.to_string()))?;

    verify_with_key(&key, payload, signature_b64)
}

fn verify_with_key(key: &VerifyingKey, payload: &str, signature_b64: &str) -> Result<bool, SecurityError> {
    let raw = BASE64
        .decode(signature_b64.trim())
        .map_err(|e| SecurityError::InvalidSignatureEncoding(e.to_string()))?;

    let Ok(bytes) = <[u8; 64]>::try_from(raw.as_slice()) else {
        return Ok(false);
    };

    let signature = Signature::from_bytes(&bytes);
    Ok(key.verify(payload.as_bytes(), &signature).is_ok())
}

// ============================================================================
// TESTS
// ============================================================================
