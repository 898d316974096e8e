//! Borehole Core - on-device credit scoring from mobile money SMS
//!
//! Parses transaction messages, maps them to a fixed feature vector, scores
//! the vector with an embedded tree ensemble and signs the result.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::config::EngineConfig;
pub use logic::pipeline::{PipelineError, ScoreReport, ScoringPipeline};
