//! Commands - JSON boundary over the scoring pipeline
//!
//! Every command takes plain strings/numbers and returns a serializable
//! response or an `ErrorResponse` carrying a stable snake_case code.

use serde::{Deserialize, Serialize};

use crate::logic::features::FEATURE_COUNT;
use crate::logic::parser::CancelSignal;
use crate::logic::pipeline::{PipelineError, ScoringPipeline};
use crate::logic::security::{verify_with_public_key, SecurityError};

use super::engine_status::EngineStatus;

// ============================================================================
// ERROR ENVELOPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJsonInput,
    ParsingFailed,
    EngineInitializationFailed,
    SigningFailed,
    InvalidSignatureEncoding,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidJsonInput => "invalid_json_input",
            ErrorCode::ParsingFailed => "parsing_failed",
            ErrorCode::EngineInitializationFailed => "engine_initialization_failed",
            ErrorCode::SigningFailed => "signing_failed",
            ErrorCode::InvalidSignatureEncoding => "invalid_signature_encoding",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error}")]
pub struct ErrorResponse {
    pub error: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: ErrorCode, details: impl Into<String>) -> Self {
        Self {
            error,
            details: Some(details.into()),
        }
    }
}

impl From<PipelineError> for ErrorResponse {
    fn from(e: PipelineError) -> Self {
        let code = match &e {
            PipelineError::Parse(_) => ErrorCode::ParsingFailed,
            PipelineError::Security(SecurityError::InvalidSignatureEncoding(_)) => {
                ErrorCode::InvalidSignatureEncoding
            }
            PipelineError::Security(_) | PipelineError::KeyStore(_) => ErrorCode::SigningFailed,
        };
        ErrorResponse::new(code, e.to_string())
    }
}

// ============================================================================
// REQUESTS / RESPONSES
// ============================================================================

/// Either `["sms", ...]` or `{ "logs": ["sms", ...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScoreRequest {
    Lines(Vec<String>),
    Envelope { logs: Vec<String> },
}

/// Message attached when nothing in a non-empty input was recognised
pub const NO_TRANSACTIONS_MESSAGE: &str = "no recognisable transactions found";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub features: [f64; FEATURE_COUNT],
    pub txn_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Non-fatal: the score is the neutral fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ErrorCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateResponse {
    pub payload: String,
    pub signature: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Decode a score request body into SMS lines
pub fn parse_score_request(request_json: &str) -> Result<Vec<String>, ErrorResponse> {
    match serde_json::from_str::<ScoreRequest>(request_json) {
        Ok(ScoreRequest::Lines(lines)) | Ok(ScoreRequest::Envelope { logs: lines }) => Ok(lines),
        Err(e) => Err(ErrorResponse::new(ErrorCode::InvalidJsonInput, e.to_string())),
    }
}

/// Score a JSON request body
pub fn score(
    pipeline: &ScoringPipeline,
    request_json: &str,
    cancel: &dyn CancelSignal,
) -> Result<ScoreResponse, ErrorResponse> {
    let lines = parse_score_request(request_json)?;
    score_lines(pipeline, &lines, cancel)
}

/// Score already-decoded lines
pub fn score_lines<S: AsRef<str>>(
    pipeline: &ScoringPipeline,
    lines: &[S],
    cancel: &dyn CancelSignal,
) -> Result<ScoreResponse, ErrorResponse> {
    let report = pipeline.score_lines(lines, cancel)?;

    Ok(ScoreResponse {
        score: report.score,
        features: report.features.values,
        txn_count: report.txn_count,
        message: report.silent.then(|| NO_TRANSACTIONS_MESSAGE.to_string()),
        warning: report
            .engine_degraded
            .then_some(ErrorCode::EngineInitializationFailed),
    })
}

pub fn issue_certificate(
    pipeline: &ScoringPipeline,
    score: f64,
    subject: &str,
) -> Result<CertificateResponse, ErrorResponse> {
    let cert = pipeline.issue_certificate(score, subject)?;

    Ok(CertificateResponse {
        payload: cert.payload,
        signature: cert.signature,
        public_key: cert.public_key,
    })
}

/// Verify against this installation's key
pub fn verify_certificate(
    pipeline: &ScoringPipeline,
    payload: &str,
    signature_b64: &str,
) -> Result<VerifyResponse, ErrorResponse> {
    let valid = pipeline.verify_certificate(payload, signature_b64)?;
    Ok(VerifyResponse { valid })
}

/// Verify against a supplied public key
pub fn verify_certificate_with_key(
    public_key_b64: &str,
    payload: &str,
    signature_b64: &str,
) -> Result<VerifyResponse, ErrorResponse> {
    match verify_with_public_key(public_key_b64, payload, signature_b64) {
        Ok(valid) => Ok(VerifyResponse { valid }),
        Err(e @ SecurityError::InvalidSignatureEncoding(_)) => Err(ErrorResponse::new(
            ErrorCode::InvalidSignatureEncoding,
            e.to_string(),
        )),
        // A key that cannot be decoded cannot have produced the signature
        Err(SecurityError::InvalidPublicKey(reason)) => {
            log::debug!("Rejecting certificate, bad public key: {}", reason);
            Ok(VerifyResponse { valid: false })
        }
        Err(e) => Err(ErrorResponse::new(ErrorCode::SigningFailed, e.to_string())),
    }
}

pub fn engine_status(pipeline: &ScoringPipeline) -> EngineStatus {
    EngineStatus::collect(pipeline)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::logic::model::{InferenceEngine, ModelSource};
    use crate::logic::parser::NeverCancel;
    use crate::logic::security::{MemoryKeyStore, SecurityModule};

    fn pipeline(source: ModelSource) -> ScoringPipeline {
        let security = SecurityModule::new(&MemoryKeyStore::with_seed([5u8; 32])).unwrap();
        ScoringPipeline::new(Arc::new(InferenceEngine::new(source)), Arc::new(security), "salt")
    }

    #[test]
    fn test_request_shapes() {
        assert_eq!(parse_score_request(r#"["a", "b"]"#).unwrap(), vec!["a", "b"]);
        assert_eq!(parse_score_request(r#"{"logs": ["a"]}"#).unwrap(), vec!["a"]);

        let err = parse_score_request("not json").unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidJsonInput);

        let err = parse_score_request(r#"{"messages": []}"#).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidJsonInput);
    }

    #[test]
    fn test_score_response() {
        let p = pipeline(ModelSource::Embedded);
        let body = r#"{"logs": ["Fuliza M-PESA. You have borrowed Ksh2,000.00"]}"#;

        let resp = score(&p, body, &NeverCancel).unwrap();
        assert_eq!(resp.txn_count, 1);
        assert_eq!(resp.features.len(), FEATURE_COUNT);
        assert!(resp.message.is_none());
        assert!(resp.warning.is_none());

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["features"].as_array().unwrap().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_score_silent_message() {
        let p = pipeline(ModelSource::Embedded);
        let resp = score(&p, r#"["Invalid log message that won't match"]"#, &NeverCancel).unwrap();

        assert_eq!(resp.txn_count, 0);
        assert_eq!(resp.message.as_deref(), Some(NO_TRANSACTIONS_MESSAGE));
    }

    #[test]
    fn test_score_empty_has_no_message() {
        let p = pipeline(ModelSource::Embedded);
        let resp = score(&p, "[]", &NeverCancel).unwrap();
        assert_eq!(resp.txn_count, 0);
        assert!(resp.message.is_none());
    }

    #[test]
    fn test_degraded_warning() {
        let p = pipeline(ModelSource::Bytes(b"{}".to_vec()));
        let resp = score(&p, r#"["x"]"#, &NeverCancel).unwrap();

        assert_eq!(resp.warning, Some(ErrorCode::EngineInitializationFailed));
        assert_eq!(resp.score, 0.5);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["warning"], "engine_initialization_failed");
    }

    #[test]
    fn test_cancelled_maps_to_parsing_failed() {
        let p = pipeline(ModelSource::Embedded);
        let cancelled = std::sync::atomic::AtomicBool::new(true);

        let err = score(&p, r#"["a", "b"]"#, &cancelled).unwrap_err();
        assert_eq!(err.error, ErrorCode::ParsingFailed);
    }

    #[test]
    fn test_certificate_and_verify() {
        let p = pipeline(ModelSource::Embedded);
        let cert = issue_certificate(&p, 0.66, "254712345678").unwrap();

        assert!(verify_certificate(&p, &cert.payload, &cert.signature).unwrap().valid);
        assert!(verify_certificate_with_key(&cert.public_key, &cert.payload, &cert.signature).unwrap().valid);
        assert!(!verify_certificate(&p, "{}", &cert.signature).unwrap().valid);
        assert!(!verify_certificate_with_key("???", &cert.payload, &cert.signature).unwrap().valid);

        let err = verify_certificate(&p, &cert.payload, "!!").unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidSignatureEncoding);
    }

    #[test]
    fn test_signing_failure_code() {
        let p = pipeline(ModelSource::Embedded);
        let err = issue_certificate(&p, f64::NAN, "subject").unwrap_err();
        assert_eq!(err.error, ErrorCode::SigningFailed);
    }

    #[test]
    fn test_error_envelope_shape() {
        let err = ErrorResponse::new(ErrorCode::InvalidJsonInput, "bad");
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"error":"invalid_json_input","details":"bad"}"#
        );
    }
}
