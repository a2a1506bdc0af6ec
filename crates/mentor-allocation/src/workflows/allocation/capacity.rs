use super::domain::Mentor;
use crate::workflows::normalizer::{fold_digits, is_blank_sentinel};

/// Raised when a capacity cell holds text that is neither a number nor a
/// recognised blank marker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("capacity value '{0}' is not numeric")]
pub struct CapacityCoercionError(pub String);

/// Coerce a raw capacity cell to an integer seat count.
///
/// Numbers are truncated toward zero, blank markers (`""`, `nan`, `none`,
/// `null`, dashes) become `0`, anything else is rejected. Pool loading, the
/// capacity gate and the trace builder all see capacities through this one
/// function so their counts cannot disagree.
pub fn coerce_capacity(raw: &str) -> Result<i64, CapacityCoercionError> {
    let folded = fold_digits(raw);
    if is_blank_sentinel(&folded) {
        return Ok(0);
    }

    let trimmed = folded.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_nan() => Ok(0),
        Ok(value) if value.is_finite() => Ok(value.trunc() as i64),
        _ => Err(CapacityCoercionError(raw.trim().to_string())),
    }
}

/// Capacity gate predicate: strictly positive remaining seats.
pub fn has_remaining(mentor: &Mentor) -> bool {
    mentor.remaining_capacity > 0
}

/// Keep only the candidates that pass the capacity gate.
pub fn capacity_gate(pool: &[Mentor], candidates: &[usize]) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&index| has_remaining(&pool[index]))
        .collect()
}
