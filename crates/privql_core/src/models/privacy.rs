//! Sensitivity and budget value handling.
//!
//! User input stays an opaque string while typing; conversion to a
//! non-negative real happens only at submission time, through one named
//! normalization rule: empty input means zero, anything else must parse as a
//! non-negative finite float.

use crate::error::PrivqlError;
use std::collections::HashMap;

/// Per-table, per-column sensitivity bounds, as submitted to the gateway.
pub type SensitivityMap = HashMap<String, HashMap<String, f64>>;

/// Per-table privacy budgets, as submitted to the gateway.
pub type BudgetMap = HashMap<String, f64>;

/// Normalize a raw input string into a non-negative real.
///
/// A blank string yields `default` (an untouched field is an explicit zero,
/// never a parse error). Non-blank input must parse as a finite, non-negative
/// float; anything else is a validation error naming `field`.
pub fn parse_or_default(field: &str, raw: &str, default: f64) -> Result<f64, PrivqlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| PrivqlError::validation(field, format!("'{trimmed}' is not a number")))?;

    if !value.is_finite() {
        return Err(PrivqlError::validation(field, format!("'{trimmed}' is not finite")));
    }
    if value < 0.0 {
        return Err(PrivqlError::validation(field, "must be non-negative"));
    }

    Ok(value)
}
