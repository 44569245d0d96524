//! Parameters structure for the drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

use crate::control::MotionGains;
use crate::kinematics::NUM_MODULES;
use crate::loc::FusionMode;
use crate::module_ctrl::{CornerConfig, ModuleGains, MotorParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drivetrain.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- TIMING ----

    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    // ---- GEOMETRY ----

    /// Offsets of each wheel's contact point from the centre of rotation, in
    /// module order (front left, front right, back left, back right).
    ///
    /// Units: meters,
    /// Frame: Body
    pub wheel_offsets_m: [[f64; 2]; NUM_MODULES],

    /// Units: meters
    pub wheel_radius_m: f64,

    /// Drive motor turns per wheel turn
    pub drive_gear_ratio: f64,

    /// Steer motor turns per steering turn
    pub steer_gear_ratio: f64,

    // ---- CAPABILITIES ----

    /// Maximum speed of any wheel over the ground.
    ///
    /// Units: meters/second
    pub max_linear_speed_ms: f64,

    /// Units: volts
    pub supply_voltage_v: f64,

    // ---- CONTROL ----

    /// Gains used when running in simulation
    pub sim_gains: ModuleGains,

    /// Gains used when running on real hardware
    pub real_gains: ModuleGains,

    /// Heading lock controller, in radians
    pub heading_lock: MotionGains,

    // ---- LOCALISATION ----

    pub fusion_mode: FusionMode,

    /// Delay after startup before the orientation sensor is reset.
    ///
    /// Units: seconds
    pub orientation_warmup_s: f64,

    /// True if the orientation sensor's yaw increases clockwise.
    pub orientation_clockwise_positive: bool,

    // ---- HARDWARE ----

    /// Drive and steer motor datasheet constants
    pub motor: MotorParams,

    /// Loads used by the simulated modules
    pub sim_loads: SimLoads,

    /// Per corner hardware configuration, in module order
    pub corners: [CornerConfig; NUM_MODULES]
}

/// Inertias seen by the simulated actuators, at the mechanism.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimLoads {
    /// Units: kilogram meters squared
    pub drive_inertia_kgm2: f64,

    /// Units: kilogram meters squared
    pub steer_inertia_kgm2: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A parameter outside of its physical range.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("{0} must be finite and positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} gains must be finite")]
    NonFiniteGains(&'static str),

    #[error("Blend fusion sensor weight must be in (0, 1], found {0}")]
    InvalidSensorWeight(f64),

    #[error("Orientation warm-up must be finite and not negative, found {0}")]
    InvalidWarmup(f64),

    #[error("Motor parameters are not physical: {0:?}")]
    InvalidMotor(MotorParams)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a physical drivetrain.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        let positive = [
            ("cycle_period_s", self.cycle_period_s),
            ("wheel_radius_m", self.wheel_radius_m),
            ("drive_gear_ratio", self.drive_gear_ratio),
            ("steer_gear_ratio", self.steer_gear_ratio),
            ("max_linear_speed_ms", self.max_linear_speed_ms),
            ("supply_voltage_v", self.supply_voltage_v),
            ("heading_lock.max_velocity", self.heading_lock.max_velocity),
            ("heading_lock.max_acceleration", self.heading_lock.max_acceleration),
            ("sim_loads.drive_inertia_kgm2", self.sim_loads.drive_inertia_kgm2),
            ("sim_loads.steer_inertia_kgm2", self.sim_loads.steer_inertia_kgm2)
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(ParamsError::NotPositive(*name, *value));
            }
        }

        for (name, gains) in [("sim_gains", &self.sim_gains), ("real_gains", &self.real_gains)].iter() {
            if !(gains.steer_pid.is_finite() 
                && gains.drive_pid.is_finite() 
                && gains.drive_ff.is_finite()) 
            {
                return Err(ParamsError::NonFiniteGains(*name));
            }
        }

        if !self.heading_lock.pid().is_finite() {
            return Err(ParamsError::NonFiniteGains("heading_lock"));
        }

        if let FusionMode::Blend { sensor_weight } = self.fusion_mode {
            if !(sensor_weight > 0.0 && sensor_weight <= 1.0) {
                return Err(ParamsError::InvalidSensorWeight(sensor_weight));
            }
        }

        if !(self.orientation_warmup_s.is_finite() && self.orientation_warmup_s >= 0.0) {
            return Err(ParamsError::InvalidWarmup(self.orientation_warmup_s));
        }

        if !self.motor.is_valid() {
            return Err(ParamsError::InvalidMotor(self.motor));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS_TOML: &str = include_str!("../../../params/drivetrain.toml");

    #[test]
    fn test_shipped_params() {
        let params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.are_valid().unwrap();

        assert_eq!(params.cycle_period_s, 0.02);
        assert_eq!(params.fusion_mode, FusionMode::Switch);
        assert_eq!(params.heading_lock, MotionGains::new(5.0, 0.0, 0.4, 8.0, 20.0));
        assert!(params.orientation_clockwise_positive);
    }

    #[test]
    fn test_invalid_params() {
        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.max_linear_speed_ms = -1.0;
        match params.are_valid() {
            Err(ParamsError::NotPositive("max_linear_speed_ms", _)) => (),
            r => panic!("Expected a max speed error, got {:?}", r)
        }

        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.fusion_mode = FusionMode::Blend { sensor_weight: 1.5 };
        assert!(matches!(params.are_valid(), Err(ParamsError::InvalidSensorWeight(_))));

        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.sim_gains.drive_pid.k_p = std::f64::NAN;
        assert!(matches!(params.are_valid(), Err(ParamsError::NonFiniteGains("sim_gains"))));
    }

    #[test]
    fn test_blend_mode_parses() {
        let toml = PARAMS_TOML.replace(
            "fusion_mode = \"Switch\"",
            "fusion_mode = { Blend = { sensor_weight = 0.2 } }"
        );
        let params: Params = util::params::parse(&toml).unwrap();
        assert_eq!(params.fusion_mode, FusionMode::Blend { sensor_weight: 0.2 });
    }
}
