//! Utility functions shared by the store, processor and import tool.
//!
//! - [`conversion`] - Raw amount parsing, float conversion and decimal scaling

mod conversion;

// ============================================
// Common Constants
// ============================================

/// Length of a quote round in seconds.
pub const ROUND_SECONDS: i64 = 3600;

// ============================================
// Re-exports
// ============================================

pub use conversion::{amount_ratio, amount_serde, amount_to_f64, parse_amount, scale_amount};
