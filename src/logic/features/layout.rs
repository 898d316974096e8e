//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schema the scoring model is trained on**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! A model file declares the layout hash it was trained against; the engine
//! refuses a model whose hash differs from `layout_hash()`.

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Cash flow (0-4) ===
    "total_income",              // 0: Sum of income amounts
    "total_expenses",            // 1: Sum of expense amounts
    "net_flow",                  // 2: Income minus expenses
    "mean_txn_amount",           // 3: Sum of all amounts / txn count
    "txn_count",                 // 4: Number of parsed transactions

    // === Behaviour (5-13) ===
    "income_regularity",         // 5: CV of peer-transfer income amounts
    "gambling_ratio",            // 6: Gambling spend / expenses
    "utility_ratio",             // 7: Utility spend / expenses
    "overdraft_usage",           // 8: Overdraft drawn / income
    "overdraft_repay_rate",      // 9: Overdraft repaid / drawn
    "p2p_ratio",                 // 10: Peer sends / expenses
    "max_single_txn",            // 11: Largest amount
    "amount_dispersion",         // 12: Population std-dev of amounts
    "days_active_proxy",         // 13: min(txn_count, 30)

    // === Credit exposure (14-18) ===
    "microloan_outstanding",     // 14: Government microloan balance
    "credit_advance_events",     // 15: Prepaid credit advance/debt events
    "alt_network_volume",        // 16: Volume on non-primary peer networks
    "unique_lender_count",       // 17: Distinct digital lenders
    "emergency_borrowing_ratio", // 18: (Credit exposure + overdraft) / income

    // === Savings & banking (19-21) ===
    "savings_ratio",             // 19: Savings deposits / income
    "avg_daily_volume",          // 20: Sum of amounts / days_active_proxy
    "bank_activity_count",       // 21: Bank deposit/withdraw events
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 22;

// ============================================================================
// LAYOUT HASH
// ============================================================================

static LAYOUT_HASH: Lazy<u32> = Lazy::new(compute_layout_hash);

/// CRC32 over the version byte followed by every name and a 0 separator
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Get layout hash (cached)
pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a model or stored vector was built against another layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================
