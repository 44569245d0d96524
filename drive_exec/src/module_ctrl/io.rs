//! Module input/output interface

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// What a module measures about its wheel each cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct WheelMeasurement {
    /// Cumulative distance rolled by the wheel.
    ///
    /// Units: meters
    pub drive_position_m: f64,

    /// Angular velocity of the wheel about its axle.
    ///
    /// Units: radians/second
    pub drive_velocity_rads: f64,

    /// Heading of the wheel, in `(-pi, pi]`.
    ///
    /// Units: radians,
    /// Frame: Body
    pub steer_heading_rad: f64,

    /// True if the heading came from the absolute encoder (always true in
    /// simulation).
    pub steer_absolute: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by devices or device drivers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("{0} did not respond")]
    NoResponse(String),

    #[error("{0} reported a fault: {1}")]
    Fault(String, String),

    #[error("{0} returned a non-finite reading")]
    BadReading(String)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Access to one module's actuators and sensors.
///
/// Selected once when the module is built.
pub trait ModuleIo: Send {
    /// Read the sensors for this cycle.
    fn update_inputs(&mut self) -> Result<WheelMeasurement, DeviceError>;

    /// Apply a voltage to the drive actuator. Callers clamp to the supply.
    fn set_drive_voltage(&mut self, volts: f64) -> Result<(), DeviceError>;

    /// Apply a voltage to the steer actuator. Callers clamp to the supply.
    fn set_steer_voltage(&mut self, volts: f64) -> Result<(), DeviceError>;
}
