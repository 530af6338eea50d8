// src/utils/rounding.rs

//! Rounding used by every derived percentage.
//!
//! Halves round towards positive infinity, so `-2.5` becomes `-2` and `2.5`
//! becomes `3`.

pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Rounds to one decimal place with the same half-up rule.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// `round(part / whole * 100)`, or 0 when `whole` is zero.
pub fn percentage(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    round_half_up(part as f64 / whole as f64 * 100.0)
}
