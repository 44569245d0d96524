//! # Feedforward models
//!
//! The standard permanent magnet DC motor feedforward:
//!
//! ```text
//! V = k_s * sgn(v) + k_g + k_v * v + k_a * a
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use util::maths;
use super::ControlResult;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Feedforward gains.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct FeedforwardGains {
    /// Static friction voltage
    ///
    /// Units: volts
    #[serde(default)]
    pub k_s: f64,

    /// Velocity gain
    ///
    /// Units: volts / (velocity unit)
    pub k_v: f64,

    /// Acceleration gain
    ///
    /// Units: volts / (acceleration unit)
    #[serde(default)]
    pub k_a: f64,

    /// Gravity (constant load) voltage
    ///
    /// Units: volts
    #[serde(default)]
    pub k_g: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FeedforwardGains {
    pub fn new(k_s: f64, k_v: f64) -> Self {
        Self {
            k_s,
            k_v,
            k_a: 0.0,
            k_g: 0.0
        }
    }

    /// Feedforward voltage to hold `velocity` while accelerating at
    /// `acceleration`.
    ///
    /// The static friction term is zero at zero velocity.
    pub fn calculate(&self, velocity: f64, acceleration: f64) -> f64 {
        self.k_s * maths::signum_or_zero(velocity)
            + self.k_g
            + self.k_v * velocity
            + self.k_a * acceleration
    }

    /// Feedforward for a constant velocity, as a control result.
    pub fn result(&self, velocity: f64) -> ControlResult {
        ControlResult::constant(self.calculate(velocity, 0.0))
    }

    pub fn is_finite(&self) -> bool {
        self.k_s.is_finite()
            && self.k_v.is_finite()
            && self.k_a.is_finite()
            && self.k_g.is_finite()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Fit `k_s` and `k_v` to a set of `(velocity, voltage)` samples by ordinary
/// least squares (`voltage = k_s + k_v * velocity`).
///
/// Returns `None` if there are fewer than two samples or all velocities are
/// the same.
pub fn fit_feedforward(samples: &[(f64, f64)]) -> Option<FeedforwardGains> {
    if samples.len() < 2 {
        return None;
    }

    let n = samples.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (x, y) in samples {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denom = n * sum_x2 - sum_x * sum_x;

    if denom.abs() < 1e-12 * n * n.max(sum_x2) {
        return None;
    }

    let k_s = (sum_y * sum_x2 - sum_x * sum_xy) / denom;
    let k_v = (n * sum_xy - sum_x * sum_y) / denom;

    if !(k_s.is_finite() && k_v.is_finite()) {
        return None;
    }

    Some(FeedforwardGains::new(k_s, k_v))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_calculate() {
        let ff = FeedforwardGains {
            k_s: 0.1,
            k_v: 0.08,
            k_a: 0.01,
            k_g: 0.0
        };

        assert!((ff.calculate(10.0, 0.0) - 0.9).abs() < 1e-12);
        assert!((ff.calculate(-10.0, 0.0) + 0.9).abs() < 1e-12);
        assert!((ff.calculate(0.0, 100.0) - 1.0).abs() < 1e-12);

        // Static friction never acts at zero velocity
        assert_eq!(ff.calculate(0.0, 0.0), 0.0);
        assert_eq!(ff.calculate(-0.0, 0.0), 0.0);
        assert!(!ff.calculate(0.0, 0.0).is_nan());
    }

    #[test]
    fn test_fit_feedforward() {
        // Samples generated from k_s = 0.2, k_v = 0.11
        let samples: Vec<(f64, f64)> = (1..20)
            .map(|i| {
                let v = i as f64 * 2.5;
                (v, 0.2 + 0.11 * v)
            })
            .collect();

        let ff = fit_feedforward(&samples).unwrap();
        assert!((ff.k_s - 0.2).abs() < 1e-9);
        assert!((ff.k_v - 0.11).abs() < 1e-9);
    }

    #[test]
    fn test_fit_feedforward_degenerate() {
        assert!(fit_feedforward(&[]).is_none());
        assert!(fit_feedforward(&[(1.0, 1.0)]).is_none());
        assert!(fit_feedforward(&[(2.0, 1.0), (2.0, 1.5), (2.0, 0.7)]).is_none());
    }
}
