//! API Module
//!
//! Structure:
//! - commands.rs: JSON request/response boundary and error codes
//! - engine_status.rs: status snapshot for `borehole status`

pub mod commands;
pub mod engine_status;

pub use commands::*;
pub use engine_status::{EngineStatus, SigningStatus};
