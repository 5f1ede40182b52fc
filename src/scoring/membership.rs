//! Fuzzification of raw signals into membership degrees in [0, 1]

/// Linear ramp from `floor` (membership 0) to `ceiling` (membership 1).
///
/// Caller guarantees `ceiling > floor`. A NaN input saturates to full
/// membership so a corrupt signal can never lower the score.
pub fn linear_ramp(value: f64, floor: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return 1.0;
    }
    ((value - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

/// Crisp membership: full weight once the rule is asserted.
pub fn crisp(asserted: bool) -> f64 {
    if asserted {
        1.0
    } else {
        0.0
    }
}
