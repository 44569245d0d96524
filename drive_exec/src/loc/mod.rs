//! # Localisation module
//!
//! Provides the chassis with an idea of where it is in the field by fusing
//! wheel odometry with an optional absolute orientation sensor.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;
mod orientation;

pub use estimator::*;
pub use orientation::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use nalgebra::{Rotation2, Vector2};

use crate::kinematics::Twist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the field frame) of the chassis.
#[derive(Debug, Copy, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Pose {
    /// The position in the field frame
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the body +X axis from the field +X axis, counter-clockwise.
    ///
    /// This is not wrapped, so that it stays continuous through any number of
    /// turns.
    ///
    /// Units: radians
    pub heading_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad
        }
    }

    pub fn x_m(&self) -> f64 {
        self.position_m.x
    }

    pub fn y_m(&self) -> f64 {
        self.position_m.y
    }

    /// Heading wrapped into `(-pi, pi]`.
    pub fn wrapped_heading_rad(&self) -> f64 {
        util::maths::wrap_pi(self.heading_rad)
    }

    /// The pose reached by following `twist`, given in this pose's body
    /// frame.
    pub fn exp(&self, twist: &Twist) -> Pose {
        let translation = Rotation2::new(self.heading_rad) * twist.exp_translation();

        Pose {
            position_m: self.position_m + translation,
            heading_rad: self.heading_rad + twist.dtheta_rad
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
