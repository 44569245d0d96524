//! Parameters for a single wheel module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::control::{FeedforwardGains, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for one module. Separate sets are used in simulation and on real
/// hardware as the physical responses differ.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct ModuleGains {
    /// Heading loop, error in radians, output in volts.
    pub steer_pid: PidGains,

    /// Drive velocity loop, error in wheel radians/second, output in volts.
    pub drive_pid: PidGains,

    /// Drive feedforward, velocity in wheel radians/second.
    pub drive_ff: FeedforwardGains
}

/// Hardware configuration of one corner.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct CornerConfig {
    /// Absolute encoder reading when the wheel points straight ahead.
    ///
    /// Units: rotations
    pub abs_encoder_offset_rot: f64,

    #[serde(default)]
    pub drive_inverted: bool,

    #[serde(default)]
    pub steer_inverted: bool
}

/// Everything a module controller needs at construction.
#[derive(Debug, Clone, Copy)]
pub struct ModuleConfig {
    /// Position of the module in module order, 0 to 3.
    pub index: usize,

    pub gains: ModuleGains,

    /// Units: meters
    pub wheel_radius_m: f64,

    /// Actuator commands are clamped to plus or minus this.
    ///
    /// Units: volts
    pub supply_voltage_v: f64,

    /// Units: seconds
    pub period_s: f64
}
