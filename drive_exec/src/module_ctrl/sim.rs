//! # Simulated module input/output
//!
//! Each actuator is modelled as a DC motor through a gearbox driving an
//! inertia:
//!
//! ```text
//! w' = A w + B V,  A = -G^2 Kt / (Kv R J),  B = G Kt / (R J)
//! ```
//!
//! where `w` is the mechanism (not rotor) angular velocity. The model is
//! integrated exactly over each period with the voltage held constant.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use util::maths;
use super::{DeviceError, ModuleIo, WheelMeasurement};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this magnitude of `A` the motor is treated as having no back EMF.
const MIN_DECAY_RATE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Datasheet constants of a brushed or brushless DC motor.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct MotorParams {
    /// Units: volts
    pub nominal_voltage_v: f64,

    /// Units: newton meters
    pub stall_torque_nm: f64,

    /// Units: amps
    pub stall_current_a: f64,

    /// Units: amps
    pub free_current_a: f64,

    /// Units: revolutions per minute
    pub free_speed_rpm: f64
}

/// Configuration of a simulated module.
#[derive(Debug, Clone, Copy)]
pub struct SimModuleConfig {
    pub motor: MotorParams,

    /// Units: kilogram meters squared
    pub drive_inertia_kgm2: f64,

    /// Units: kilogram meters squared
    pub steer_inertia_kgm2: f64,

    /// Rotor turns per wheel turn
    pub drive_gear_ratio: f64,

    /// Rotor turns per steering turn
    pub steer_gear_ratio: f64,

    /// Units: meters
    pub wheel_radius_m: f64,

    /// Units: volts
    pub supply_voltage_v: f64,

    /// Units: seconds
    pub period_s: f64
}

/// A geared DC motor driving an inertia.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DcMotorSim {
    /// Velocity decay rate
    ///
    /// Units: 1/seconds
    a: f64,

    /// Velocity gain per volt
    ///
    /// Units: radians/(second^2 volt)
    b: f64,

    /// Units: radians
    position_rad: f64,

    /// Units: radians/second
    velocity_rads: f64,

    /// Units: volts
    input_v: f64
}

/// Simulated module, integrating a drive and a steer motor model.
pub struct SimModuleIo {
    drive: DcMotorSim,
    steer: DcMotorSim,
    wheel_radius_m: f64,
    supply_voltage_v: f64,
    period_s: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorParams {
    /// Winding resistance.
    ///
    /// Units: ohms
    pub fn resistance_ohm(&self) -> f64 {
        self.nominal_voltage_v / self.stall_current_a
    }

    /// Speed constant.
    ///
    /// Units: radians/(second volt)
    pub fn kv_rads_per_v(&self) -> f64 {
        let free_speed_rads = self.free_speed_rpm * 2.0 * PI / 60.0;
        free_speed_rads / (self.nominal_voltage_v - self.resistance_ohm() * self.free_current_a)
    }

    /// Torque constant.
    ///
    /// Units: newton meters/amp
    pub fn kt_nm_per_a(&self) -> f64 {
        self.stall_torque_nm / self.stall_current_a
    }

    pub fn is_valid(&self) -> bool {
        let positive = [
            self.nominal_voltage_v,
            self.stall_torque_nm,
            self.stall_current_a,
            self.free_speed_rpm
        ].iter().all(|v| v.is_finite() && *v > 0.0);

        positive 
            && self.free_current_a.is_finite()
            && self.free_current_a >= 0.0
            && self.kv_rads_per_v().is_finite()
            && self.kv_rads_per_v() > 0.0
    }
}

impl DcMotorSim {
    pub fn new(motor: &MotorParams, gear_ratio: f64, inertia_kgm2: f64) -> Self {
        let r = motor.resistance_ohm();
        let kv = motor.kv_rads_per_v();
        let kt = motor.kt_nm_per_a();

        Self {
            a: -gear_ratio * gear_ratio * kt / (kv * r * inertia_kgm2),
            b: gear_ratio * kt / (r * inertia_kgm2),
            position_rad: 0.0,
            velocity_rads: 0.0,
            input_v: 0.0
        }
    }

    pub fn set_input_voltage(&mut self, volts: f64) {
        self.input_v = volts;
    }

    pub fn input_voltage(&self) -> f64 {
        self.input_v
    }

    pub fn position_rad(&self) -> f64 {
        self.position_rad
    }

    pub fn velocity_rads(&self) -> f64 {
        self.velocity_rads
    }

    /// Steady state velocity for a constant voltage.
    ///
    /// Units: radians/second
    pub fn steady_state_velocity(&self, volts: f64) -> f64 {
        if self.a.abs() < MIN_DECAY_RATE {
            std::f64::INFINITY
        }
        else {
            -self.b * volts / self.a
        }
    }

    /// Advance the model by `dt_s` with the input voltage held.
    pub fn update(&mut self, dt_s: f64) {
        let v0 = self.velocity_rads;
        let bu = self.b * self.input_v;

        if self.a.abs() < MIN_DECAY_RATE {
            self.position_rad += v0 * dt_s + 0.5 * bu * dt_s * dt_s;
            self.velocity_rads += bu * dt_s;
        }
        else {
            let decay = (self.a * dt_s).exp();
            let phi = (decay - 1.0) / self.a;

            self.position_rad += phi * v0 + bu / self.a * (phi - dt_s);
            self.velocity_rads = decay * v0 + phi * bu;
        }
    }
}

impl SimModuleIo {
    pub fn new(config: &SimModuleConfig) -> Self {
        Self {
            drive: DcMotorSim::new(
                &config.motor, config.drive_gear_ratio, config.drive_inertia_kgm2
            ),
            steer: DcMotorSim::new(
                &config.motor, config.steer_gear_ratio, config.steer_inertia_kgm2
            ),
            wheel_radius_m: config.wheel_radius_m,
            supply_voltage_v: config.supply_voltage_v,
            period_s: config.period_s
        }
    }

    pub fn drive_motor(&self) -> &DcMotorSim {
        &self.drive
    }

    pub fn steer_motor(&self) -> &DcMotorSim {
        &self.steer
    }
}

impl ModuleIo for SimModuleIo {
    fn update_inputs(&mut self) -> Result<WheelMeasurement, DeviceError> {
        self.drive.update(self.period_s);
        self.steer.update(self.period_s);

        Ok(WheelMeasurement {
            drive_position_m: self.drive.position_rad() * self.wheel_radius_m,
            drive_velocity_rads: self.drive.velocity_rads(),
            steer_heading_rad: maths::wrap_pi(self.steer.position_rad()),
            steer_absolute: true
        })
    }

    fn set_drive_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        let s = self.supply_voltage_v;
        self.drive.set_input_voltage(maths::clamp(&volts, &-s, &s));
        Ok(())
    }

    fn set_steer_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        let s = self.supply_voltage_v;
        self.steer.set_input_voltage(maths::clamp(&volts, &-s, &s));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn neo() -> MotorParams {
        MotorParams {
            nominal_voltage_v: 12.0,
            stall_torque_nm: 2.6,
            stall_current_a: 105.0,
            free_current_a: 1.8,
            free_speed_rpm: 5676.0
        }
    }

    #[test]
    fn test_motor_constants() {
        let m = neo();
        assert!(m.is_valid());
        assert!((m.resistance_ohm() - 0.1142857).abs() < 1e-6);
        assert!((m.kv_rads_per_v() - 50.40).abs() < 0.01);
        assert!((m.kt_nm_per_a() - 0.0247619).abs() < 1e-6);

        let mut bad = neo();
        bad.stall_current_a = 0.0;
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_steady_state_and_time_constant() {
        let mut sim = DcMotorSim::new(&neo(), 5.36, 0.025);
        sim.set_input_voltage(12.0);

        let ss = sim.steady_state_velocity(12.0);
        // Free speed of the wheel through the reduction
        assert!((ss - 12.0 * neo().kv_rads_per_v() / 5.36).abs() < 1e-9);

        // After one time constant the velocity is 1 - 1/e of its final value
        let tau = -1.0 / sim.a;
        sim.update(tau);
        assert!((sim.velocity_rads() / ss - (1.0 - (-1.0f64).exp())).abs() < 1e-9);

        // Stepping in small increments matches one large step
        let mut fine = DcMotorSim::new(&neo(), 5.36, 0.025);
        fine.set_input_voltage(12.0);
        for _ in 0..100 {
            fine.update(tau / 100.0);
        }
        assert!((fine.velocity_rads() - sim.velocity_rads()).abs() < 1e-9);
        assert!((fine.position_rad() - sim.position_rad()).abs() < 1e-9);
    }

    #[test]
    fn test_sim_io_clamps_voltage() {
        let mut io = SimModuleIo::new(&SimModuleConfig {
            motor: neo(),
            drive_inertia_kgm2: 0.025,
            steer_inertia_kgm2: 0.004,
            drive_gear_ratio: 5.36,
            steer_gear_ratio: 18.75,
            wheel_radius_m: 0.0508,
            supply_voltage_v: 12.0,
            period_s: 0.02
        });

        io.set_drive_voltage(100.0).unwrap();
        io.set_steer_voltage(-100.0).unwrap();
        assert_eq!(io.drive_motor().input_voltage(), 12.0);
        assert_eq!(io.steer_motor().input_voltage(), -12.0);

        let m = io.update_inputs().unwrap();
        assert!(m.drive_velocity_rads > 0.0);
        assert!(m.drive_position_m > 0.0);
        assert!(m.steer_heading_rad < 0.0);
        assert!(m.steer_absolute);
    }
}
