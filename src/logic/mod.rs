//! Logic Module - Scoring engines
//!
//! - `parser/` - SMS → transactions (keyword routing + provider regexes)
//! - `features/` - transactions → versioned 22-feature vector
//! - `model/` - gradient-boosted tree inference with neutral fallback
//! - `security/` - Ed25519 score certificates and key storage
//! - `pipeline` - the composed request path
//! - `config` - environment-driven configuration

pub mod config;
pub mod features;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod security;
