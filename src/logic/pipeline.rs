//! Scoring Pipeline - Parser → Vectorizer → Inference → Signing
//!
//! One shared, immutable object per process. Each request runs synchronously
//! on the caller's thread; the only cooperative stop point is the parser's
//! cancellation check.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logic::config::EngineConfig;
use crate::logic::features::{vectorize, FeatureVector};
use crate::logic::model::InferenceEngine;
use crate::logic::parser::{CancelSignal, ParseError, SmsParser};
use crate::logic::security::{
    anonymize_subject, KeyStoreError, SecurityError, SecurityModule, SignedCertificate,
};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("signing key unavailable: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

// ============================================================================
// REPORT
// ============================================================================

/// Outcome of scoring one batch of messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: f64,
    pub features: FeatureVector,
    pub txn_count: usize,
    pub skipped: usize,
    /// Non-empty input but nothing recognised
    pub silent: bool,
    /// Score is the neutral fallback because the model could not be loaded
    pub engine_degraded: bool,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct ScoringPipeline {
    parser: SmsParser,
    engine: Arc<InferenceEngine>,
    security: Arc<SecurityModule>,
    subject_salt: String,
}

impl ScoringPipeline {
    pub fn new(
        engine: Arc<InferenceEngine>,
        security: Arc<SecurityModule>,
        subject_salt: impl Into<String>,
    ) -> Self {
        Self {
            parser: SmsParser::new(),
            engine,
            security,
            subject_salt: subject_salt.into(),
        }
    }

    /// Build every component from configuration. Fails only if the signing
    /// key cannot be obtained; a bad model degrades instead.
    pub fn from_config(config: &EngineConfig) -> Result<Self, PipelineError> {
        let mut engine = InferenceEngine::new(config.model_source.clone());
        if let Some(sha) = &config.model_sha256 {
            engine = engine.with_expected_sha256(sha.clone());
        }

        let store = config.key_store.build();
        let security = SecurityModule::new(store.as_ref())?;

        Ok(Self::new(
            Arc::new(engine),
            Arc::new(security),
            config.subject_salt.clone(),
        ))
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn security(&self) -> &SecurityModule {
        &self.security
    }

    /// Parse, vectorize and score. Only cancellation fails the request.
    pub fn score_lines<S: AsRef<str>>(
        &self,
        lines: &[S],
        cancel: &dyn CancelSignal,
    ) -> Result<ScoreReport, PipelineError> {
        let batch = self.parser.parse_batch(lines, cancel)?;
        let features = vectorize(&batch.transactions);

        let engine_degraded = self.engine.initialize().is_err();
        let score = self.engine.predict(features.as_slice());

        if batch.is_silent() {
            log::info!("No recognisable transactions in {} lines", lines.len());
        }
        log::debug!("Feature vector: {}", features.to_log_entry());
        log::info!(
            "Scored {} transactions ({} skipped): {:.4}{}",
            batch.transactions.len(),
            batch.skipped,
            score,
            if engine_degraded { " [fallback]" } else { "" }
        );

        Ok(ScoreReport {
            score,
            features,
            txn_count: batch.transactions.len(),
            skipped: batch.skipped,
            silent: batch.is_silent(),
            engine_degraded,
        })
    }

    /// Sign `score` for a subject. The raw id is anonymised before it enters the payload.
    pub fn issue_certificate(&self, score: f64, raw_subject: &str) -> Result<SignedCertificate, PipelineError> {
        let uid = anonymize_subject(&self.subject_salt, raw_subject);
        Ok(self.security.issue_certificate(score, &uid)?)
    }

    pub fn verify_certificate(&self, payload: &str, signature_b64: &str) -> Result<bool, PipelineError> {
        Ok(self.security.verify_certificate(payload, signature_b64)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
