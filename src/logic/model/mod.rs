//! Model Module - Credit scoring inference
//!
//! Gradient-boosted tree ensemble evaluated in-process, behind a lazily
//! initialised engine with a neutral fallback.

pub mod ensemble;
pub mod inference;

// Re-export common types
pub use ensemble::{ModelError, Objective, TreeEnsemble};
pub use inference::{InferenceEngine, ModelSource, ModelStatus, NEUTRAL_SCORE};
