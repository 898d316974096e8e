//! Inference Engine - Credit score from a feature vector
//!
//! Owns one tree ensemble, loaded lazily on first use. A load failure puts the
//! engine in a permanent degraded state where every prediction is the neutral
//! score; it is logged once and never retried.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::ensemble::{ModelError, TreeEnsemble};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Returned whenever no real prediction is possible
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Model shipped inside the binary
static EMBEDDED_MODEL: &[u8] = include_bytes!("assets/borehole_model.json");

// ============================================================================
// MODEL SOURCE
// ============================================================================

#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Resource compiled into the binary
    Embedded,
    /// Caller-supplied bytes
    Bytes(Vec<u8>),
    /// File on disk, read on first use
    File(PathBuf),
}

impl ModelSource {
    fn read(&self) -> Result<Cow<'_, [u8]>, ModelError> {
        match self {
            ModelSource::Embedded => Ok(Cow::Borrowed(EMBEDDED_MODEL)),
            ModelSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            ModelSource::File(path) => std::fs::read(path).map(Cow::Owned).map_err(|e| ModelError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ModelSource::Embedded => "embedded".to_string(),
            ModelSource::Bytes(bytes) => format!("bytes ({} B)", bytes.len()),
            ModelSource::File(path) => path.display().to_string(),
        }
    }
}

// ============================================================================
// STATUS
// ============================================================================

/// Model status for CLI / boundary reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub source: String,
    pub objective: Option<String>,
    pub num_trees: usize,
    pub num_feature: usize,
    pub feature_version: Option<u8>,
    pub layout_hash: Option<u32>,
    pub sha256: Option<String>,
    pub degraded_reason: Option<String>,
    pub inference_count: u64,
    pub avg_latency_ms: f64,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
enum ModelState {
    Ready(TreeEnsemble),
    Degraded(ModelError),
}

pub struct InferenceEngine {
    source: ModelSource,
    expected_sha256: Option<String>,
    state: OnceCell<ModelState>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl InferenceEngine {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            expected_sha256: None,
            state: OnceCell::new(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Engine over the model compiled into the binary
    pub fn embedded() -> Self {
        Self::new(ModelSource::Embedded)
    }

    /// Require the model resource to hash to `sha256` (hex)
    pub fn with_expected_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into());
        self
    }

    /// Loaded exactly once; concurrent first callers block on the same load
    fn state(&self) -> &ModelState {
        self.state.get_or_init(|| self.load())
    }

    fn load(&self) -> ModelState {
        let started = Instant::now();
        let loaded = self
            .source
            .read()
            .and_then(|bytes| TreeEnsemble::from_slice(&bytes, self.expected_sha256.as_deref()));

        match loaded {
            Ok(model) => {
                log::info!(
                    "Scoring model loaded from {} ({} trees, {} nodes, {}) in {:?}",
                    self.source.describe(),
                    model.num_trees(),
                    model.num_nodes(),
                    model.objective().as_str(),
                    started.elapsed()
                );
                ModelState::Ready(model)
            }
            Err(e) => {
                log::warn!(
                    "Scoring model unavailable ({}), predictions fall back to {}",
                    e,
                    NEUTRAL_SCORE
                );
                ModelState::Degraded(e)
            }
        }
    }

    /// Force the lazy load and report its outcome
    pub fn initialize(&self) -> Result<(), ModelError> {
        match self.state() {
            ModelState::Ready(_) => Ok(()),
            ModelState::Degraded(e) => Err(e.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), ModelState::Ready(_))
    }

    /// Probability in [0, 1]. Wrong width, a degraded engine or a non-finite
    /// result all yield `NEUTRAL_SCORE`.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let started = Instant::now();

        let score = match self.state() {
            ModelState::Ready(model) if features.len() == model.num_feature() => {
                let margin = model.margin(features);
                let probability = 1.0 / (1.0 + (-margin).exp());
                if probability.is_finite() {
                    probability.clamp(0.0, 1.0)
                } else {
                    NEUTRAL_SCORE
                }
            }
            // Wrong width or no model
            ModelState::Ready(_) | ModelState::Degraded(_) => NEUTRAL_SCORE,
        };

        self.latency_sum_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        score
    }

    pub fn status(&self) -> ModelStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };

        let mut status = ModelStatus {
            model_loaded: false,
            source: self.source.describe(),
            objective: None,
            num_trees: 0,
            num_feature: 0,
            feature_version: None,
            layout_hash: None,
            sha256: None,
            degraded_reason: None,
            inference_count: count,
            avg_latency_ms: avg,
        };

        match self.state() {
            ModelState::Ready(model) => {
                status.model_loaded = true;
                status.objective = Some(model.objective().as_str().to_string());
                status.num_trees = model.num_trees();
                status.num_feature = model.num_feature();
                status.feature_version = Some(model.feature_version());
                status.layout_hash = model.layout_hash();
                status.sha256 = Some(model.sha256().to_string());
            }
            ModelState::Degraded(e) => {
                status.degraded_reason = Some(e.to_string());
            }
        }

        status
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::embedded()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{vectorize, FEATURE_COUNT};
    use std::sync::Arc;

    const STUMP: &str = r#"[
        { "nodeid": 0, "split": "f6", "split_condition": 0.2, "yes": 1, "no": 2, "missing": 1,
          "children": [ { "nodeid": 1, "leaf": 2.0 }, { "nodeid": 2, "leaf": -2.0 } ] }
    ]"#;

    fn stump_engine() -> InferenceEngine {
        InferenceEngine::new(ModelSource::Bytes(STUMP.as_bytes().to_vec()))
    }

    #[test]
    fn test_embedded_model_loads() {
        let engine = InferenceEngine::embedded();
        assert!(engine.initialize().is_ok());

        let status = engine.status();
        assert!(status.model_loaded);
        assert_eq!(status.num_feature, FEATURE_COUNT);
        assert!(status.num_trees > 0);
        assert!(status.sha256.is_some());
    }

    #[test]
    fn test_embedded_score_in_range() {
        let engine = InferenceEngine::embedded();
        let score = engine.predict(vectorize(&[]).as_slice());
        assert!((0.0..=1.0).contains(&score));

        let same = engine.predict(vectorize(&[]).as_slice());
        assert_eq!(score, same);
    }

    #[test]
    fn test_predict_sigmoid() {
        let engine = stump_engine();
        let mut x = [0.0; FEATURE_COUNT];

        let good = engine.predict(&x);
        assert!((good - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);

        x[6] = 0.9;
        let bad = engine.predict(&x);
        assert!(bad < good);
        assert!((good + bad - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_width_is_neutral() {
        let engine = stump_engine();
        assert_eq!(engine.predict(&[0.0; 20]), NEUTRAL_SCORE);
        assert_eq!(engine.predict(&[]), NEUTRAL_SCORE);
    }

    #[test]
    fn test_degraded_engine() {
        let engine = InferenceEngine::new(ModelSource::Bytes(b"{ not a model".to_vec()));

        assert!(matches!(engine.initialize(), Err(ModelError::Parse(_))));
        assert!(!engine.is_ready());
        assert_eq!(engine.predict(&[0.0; FEATURE_COUNT]), NEUTRAL_SCORE);

        let status = engine.status();
        assert!(!status.model_loaded);
        assert!(status.degraded_reason.is_some());
    }

    #[test]
    fn test_corrupt_node_id_degrades() {
        let json = format!(r#"[ {{ "nodeid": {}, "leaf": 0.1 }} ]"#, usize::MAX);
        let engine = InferenceEngine::new(ModelSource::Bytes(json.into_bytes()));

        assert_eq!(engine.predict(&[0.0; FEATURE_COUNT]), NEUTRAL_SCORE);
        assert!(matches!(engine.initialize(), Err(ModelError::InvalidTree { .. })));
    }

    #[test]
    fn test_missing_file_degrades() {
        let engine = InferenceEngine::new(ModelSource::File(PathBuf::from("/nonexistent/model.json")));
        assert!(matches!(engine.initialize(), Err(ModelError::Io { .. })));
        assert_eq!(engine.predict(&[0.0; FEATURE_COUNT]), NEUTRAL_SCORE);
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, STUMP).unwrap();

        let engine = InferenceEngine::new(ModelSource::File(path));
        assert!(engine.is_ready());
    }

    #[test]
    fn test_expected_checksum_mismatch_degrades() {
        let engine = stump_engine().with_expected_sha256("deadbeef");
        assert!(matches!(engine.initialize(), Err(ModelError::Checksum { .. })));
    }

    #[test]
    fn test_concurrent_first_use() {
        let engine = Arc::new(stump_engine());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.predict(&[0.0; FEATURE_COUNT]))
            })
            .collect();

        let scores: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(engine.status().inference_count, 8);
    }
}
