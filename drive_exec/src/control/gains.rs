//! Controller gain sets

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for a PID controller.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    #[serde(default)]
    pub k_i: f64,

    /// Derivative gain
    #[serde(default)]
    pub k_d: f64
}

/// Velocity and acceleration limits of a trapezoidal motion profile.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct ProfileConstraints {
    /// Units: position units per second
    pub max_velocity: f64,

    /// Units: position units per second squared
    pub max_acceleration: f64
}

/// Gains for a profiled (motion model) PID controller.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct MotionGains {
    pub k_p: f64,

    #[serde(default)]
    pub k_i: f64,

    #[serde(default)]
    pub k_d: f64,

    /// Units: position units per second
    pub max_velocity: f64,

    /// Units: position units per second squared
    pub max_acceleration: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }

    /// True if every gain is a finite number.
    pub fn is_finite(&self) -> bool {
        self.k_p.is_finite() && self.k_i.is_finite() && self.k_d.is_finite()
    }
}

impl MotionGains {
    pub fn new(
        k_p: f64, 
        k_i: f64, 
        k_d: f64, 
        max_velocity: f64, 
        max_acceleration: f64
    ) -> Self {
        Self { k_p, k_i, k_d, max_velocity, max_acceleration }
    }

    /// The feedback part of the gains.
    pub fn pid(&self) -> PidGains {
        PidGains::new(self.k_p, self.k_i, self.k_d)
    }

    /// The profile limits part of the gains.
    pub fn constraints(&self) -> ProfileConstraints {
        ProfileConstraints {
            max_velocity: self.max_velocity,
            max_acceleration: self.max_acceleration
        }
    }
}
