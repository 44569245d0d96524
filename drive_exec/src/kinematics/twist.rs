//! Twists, small rigid body motions in the plane

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this rotation the series expansions are used.
const SMALL_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A motion along a constant curvature arc, expressed in the frame at the
/// start of the motion.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct Twist {
    /// Units: meters
    pub dx_m: f64,

    /// Units: meters
    pub dy_m: f64,

    /// Units: radians
    pub dtheta_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Twist {
    pub fn new(dx_m: f64, dy_m: f64, dtheta_rad: f64) -> Self {
        Self {
            dx_m,
            dy_m,
            dtheta_rad
        }
    }

    /// The translation produced by following this twist, in the start frame.
    ///
    /// The rotation produced is `dtheta_rad`.
    pub fn exp_translation(&self) -> Vector2<f64> {
        let theta = self.dtheta_rad;
        let (sin, cos) = theta.sin_cos();

        let (s, c) = if theta.abs() < SMALL_ANGLE_RAD {
            (1.0 - theta * theta / 6.0, 0.5 * theta)
        }
        else {
            (sin / theta, (1.0 - cos) / theta)
        };

        Vector2::new(
            self.dx_m * s - self.dy_m * c,
            self.dx_m * c + self.dy_m * s
        )
    }

    /// The twist which moves from the origin to `translation` with a rotation
    /// of `dtheta_rad`. Inverse of `exp_translation`.
    pub fn log(translation: Vector2<f64>, dtheta_rad: f64) -> Self {
        let half_theta = dtheta_rad / 2.0;
        let cos_minus_one = dtheta_rad.cos() - 1.0;

        let half_theta_by_tan = if cos_minus_one.abs() < SMALL_ANGLE_RAD {
            1.0 - dtheta_rad * dtheta_rad / 12.0
        }
        else {
            -(half_theta * dtheta_rad.sin()) / cos_minus_one
        };

        Self {
            dx_m: translation.x * half_theta_by_tan + translation.y * half_theta,
            dy_m: translation.y * half_theta_by_tan - translation.x * half_theta,
            dtheta_rad
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_quarter_circle() {
        // Quarter of a circle of radius 1 m, turning left
        let twist = Twist::new(FRAC_PI_2, 0.0, FRAC_PI_2);
        let t = twist.exp_translation();

        assert!((t.x - 1.0).abs() < 1e-9);
        assert!((t.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_inverts_exp() {
        for &(dx, dy, dtheta) in &[
            (1.0, 0.0, 0.0),
            (0.3, -0.2, 0.5),
            (-0.1, 0.4, -1.2),
            (0.0, 0.0, 2.0),
            (0.02, 0.0, 1e-12)
        ] {
            let twist = Twist::new(dx, dy, dtheta);
            let back = Twist::log(twist.exp_translation(), dtheta);

            assert!((back.dx_m - dx).abs() < 1e-9, "{:?} -> {:?}", twist, back);
            assert!((back.dy_m - dy).abs() < 1e-9, "{:?} -> {:?}", twist, back);
        }
    }
}
