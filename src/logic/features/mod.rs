//! Features Module - Transaction to feature mapping
//!
//! Turns a parsed transaction batch into the fixed-width vector the scoring
//! model consumes. The layout is versioned and hashed so a model can declare
//! which layout it was trained on.

pub mod layout;
pub mod stats;
pub mod vector;
pub mod vectorizer;


// Re-export common types
pub use layout::{layout_hash, LayoutInfo, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::{FeatureExtractor, FeatureVector};
pub use vectorizer::{vectorize, TransactionLedger};
