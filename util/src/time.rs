//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if the nanosecond
/// count overflows.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Time into a fixed-rate loop after `num_cycles` cycles of `period_s`.
///
/// Computed from the cycle count, never accumulated.
pub fn cycle_time_s(num_cycles: u64, period_s: f64) -> f64 {
    num_cycles as f64 * period_s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }

    #[test]
    fn test_cycle_time() {
        assert!((cycle_time_s(50, 0.02) - 1.0).abs() < 1e-12);
        assert_eq!(cycle_time_s(0, 0.02), 0.0);
    }
}
