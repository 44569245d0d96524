//! Velocity and wheel state types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A velocity of the chassis.
///
/// Whether this is in the body or field frame depends on where it is used.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct BodyVelocity {
    /// Units: meters/second
    pub forward_ms: f64,

    /// Units: meters/second, positive to the left
    pub strafe_ms: f64,

    /// Units: radians/second, positive counter-clockwise
    pub angular_rads: f64
}

/// The commanded or measured state of a single wheel.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct WheelState {
    /// Signed speed of the wheel over the ground.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Heading of the wheel in the body frame.
    ///
    /// Units: radians
    pub heading_rad: f64
}

/// The cumulative distance and heading of a single wheel.
///
/// Also used for per-cycle deltas, where `distance_m` is the distance
/// travelled since the last cycle.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct WheelPosition {
    /// Units: meters
    pub distance_m: f64,

    /// Units: radians
    pub heading_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BodyVelocity {
    pub fn new(forward_ms: f64, strafe_ms: f64, angular_rads: f64) -> Self {
        Self {
            forward_ms,
            strafe_ms,
            angular_rads
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Convert a field frame velocity into the body frame of a chassis with
    /// the given heading.
    pub fn from_field_relative(field: BodyVelocity, heading_rad: f64) -> Self {
        let (sin, cos) = heading_rad.sin_cos();

        Self {
            forward_ms: field.forward_ms * cos + field.strafe_ms * sin,
            strafe_ms: -field.forward_ms * sin + field.strafe_ms * cos,
            angular_rads: field.angular_rads
        }
    }

    /// Convert this body frame velocity into the field frame.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        let (sin, cos) = heading_rad.sin_cos();

        Self {
            forward_ms: self.forward_ms * cos - self.strafe_ms * sin,
            strafe_ms: self.forward_ms * sin + self.strafe_ms * cos,
            angular_rads: self.angular_rads
        }
    }

    pub fn is_finite(&self) -> bool {
        self.forward_ms.is_finite() 
            && self.strafe_ms.is_finite() 
            && self.angular_rads.is_finite()
    }

    /// Linear speed of the chassis.
    ///
    /// Units: meters/second
    pub fn linear_speed_ms(&self) -> f64 {
        self.forward_ms.hypot(self.strafe_ms)
    }
}

impl WheelState {
    pub fn new(speed_ms: f64, heading_rad: f64) -> Self {
        Self {
            speed_ms,
            heading_rad
        }
    }

    /// Find the equivalent state which needs the least steering from
    /// `current_heading_rad`.
    ///
    /// If the target heading is more than 90 degrees away it is flipped by 180
    /// degrees and the speed negated. The returned heading is in `(-pi, pi]`.
    pub fn optimise(&self, current_heading_rad: f64) -> Self {
        let delta = get_ang_dist(current_heading_rad, self.heading_rad);

        if delta.abs() > FRAC_PI_2 {
            Self {
                speed_ms: -self.speed_ms,
                heading_rad: wrap_pi(self.heading_rad + PI)
            }
        }
        else {
            Self {
                speed_ms: self.speed_ms,
                heading_rad: wrap_pi(self.heading_rad)
            }
        }
    }
}

impl WheelPosition {
    pub fn new(distance_m: f64, heading_rad: f64) -> Self {
        Self {
            distance_m,
            heading_rad
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_optimise_flips_beyond_quarter_turn() {
        let step = 0.05;
        for i in 0..126 {
            let current = -PI + step * i as f64;
            for j in 0..126 {
                let desired = -PI + step * j as f64;
                let state = WheelState::new(1.5, desired);
                let opt = state.optimise(current);

                let dist = get_ang_dist(current, desired);
                if dist.abs() > FRAC_PI_2 {
                    assert_eq!(opt.speed_ms, -1.5);
                    assert!(get_ang_dist(wrap_pi(desired + PI), opt.heading_rad).abs() < 1e-9);
                }
                else {
                    assert_eq!(opt.speed_ms, 1.5);
                    assert!(get_ang_dist(desired, opt.heading_rad).abs() < 1e-9);
                }

                // The optimised heading never needs more than a quarter turn
                assert!(get_ang_dist(current, opt.heading_rad).abs() <= FRAC_PI_2 + 1e-9);
                assert!(opt.heading_rad > -PI && opt.heading_rad <= PI);
            }
        }
    }

    #[test]
    fn test_optimise_example() {
        let opt = WheelState::new(2.0, PI).optimise(0.0);
        assert_eq!(opt.speed_ms, -2.0);
        assert!(opt.heading_rad.abs() < 1e-12);
    }

    #[test]
    fn test_field_relative() {
        let field = BodyVelocity::new(1.0, 0.0, 0.5);

        // Chassis facing +Y in the field, field +X is to its right
        let body = BodyVelocity::from_field_relative(field, FRAC_PI_2);
        assert!(body.forward_ms.abs() < 1e-12);
        assert!((body.strafe_ms + 1.0).abs() < 1e-12);
        assert_eq!(body.angular_rads, 0.5);
        assert!((body.linear_speed_ms() - 1.0).abs() < 1e-12);

        let back = body.to_field_relative(FRAC_PI_2);
        assert!((back.forward_ms - 1.0).abs() < 1e-12);
        assert!(back.strafe_ms.abs() < 1e-12);
    }
}
