//! # Real module input/output
//!
//! Reads the module's physical sensors through driver traits and writes
//! voltages to its actuators. The steer heading comes from an absolute encoder
//! when it is connected, otherwise from the steer motor's relative encoder,
//! continuing from the last good absolute reading so that the heading does
//! not jump when the absolute encoder drops out.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::f64::consts::TAU;

// Internal
use util::maths;
use super::{Corner, CornerConfig, DeviceError, ModuleIo, WheelMeasurement};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A motor controller with an integrated relative encoder.
///
/// Positions and velocities are of the motor rotor, before any reduction.
pub trait Actuator: Send {
    fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError>;

    /// Units: radians
    fn position_rad(&self) -> Result<f64, DeviceError>;

    /// Units: radians/second
    fn velocity_rads(&self) -> Result<f64, DeviceError>;
}

/// An absolute angle sensor on the steering axis.
pub trait AbsoluteEncoder: Send {
    fn is_connected(&self) -> bool;

    /// Units: rotations
    fn rotations(&self) -> Result<f64, DeviceError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gearing of a module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleGearing {
    /// Rotor turns per wheel turn
    pub drive_gear_ratio: f64,

    /// Rotor turns per steering turn
    pub steer_gear_ratio: f64,

    /// Units: meters
    pub wheel_radius_m: f64
}

/// The device drivers of one module.
pub struct ModuleDrivers {
    pub drive: Box<dyn Actuator>,
    pub steer: Box<dyn Actuator>,
    pub abs_encoder: Box<dyn AbsoluteEncoder>
}

/// Module input/output backed by real devices.
pub struct RealModuleIo {
    corner: Corner,
    config: CornerConfig,
    gearing: ModuleGearing,

    drive: Box<dyn Actuator>,
    steer: Box<dyn Actuator>,
    abs_encoder: Box<dyn AbsoluteEncoder>,

    /// Last good absolute heading paired with the relative steer angle at the
    /// same instant.
    abs_reference: Option<AbsReference>,

    /// True while the relative encoder is standing in for the absolute one.
    using_fallback: bool
}

#[derive(Debug, Clone, Copy)]
struct AbsReference {
    heading_rad: f64,
    relative_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RealModuleIo {
    pub fn new(
        corner: Corner,
        config: CornerConfig,
        gearing: ModuleGearing,
        drivers: ModuleDrivers
    ) -> Self {
        let ModuleDrivers { drive, steer, abs_encoder } = drivers;

        Self {
            corner,
            config,
            gearing,
            drive,
            steer,
            abs_encoder,
            abs_reference: None,
            using_fallback: false
        }
    }

    fn drive_sign(&self) -> f64 {
        if self.config.drive_inverted { -1.0 } else { 1.0 }
    }

    fn steer_sign(&self) -> f64 {
        if self.config.steer_inverted { -1.0 } else { 1.0 }
    }

    /// Steering angle from the relative encoder, unwrapped.
    fn relative_steer_rad(&self) -> Result<f64, DeviceError> {
        let rotor = self.steer.position_rad()?;
        Ok(self.steer_sign() * rotor / self.gearing.steer_gear_ratio)
    }

    /// Read the absolute encoder, `None` if it is disconnected or the read
    /// fails.
    fn read_absolute(&self) -> Option<f64> {
        if !self.abs_encoder.is_connected() {
            return None;
        }

        match self.abs_encoder.rotations() {
            Ok(r) if r.is_finite() => 
                Some(maths::wrap_pi((r - self.config.abs_encoder_offset_rot) * TAU)),
            _ => None
        }
    }

    fn read_heading(&mut self, relative_rad: f64) -> f64 {
        match self.read_absolute() {
            Some(heading) => {
                if self.using_fallback {
                    info!("{} absolute steer encoder reconnected", self.corner);
                    self.using_fallback = false;
                }

                self.abs_reference = Some(AbsReference {
                    heading_rad: heading,
                    relative_rad
                });

                heading
            },
            None => {
                if !self.using_fallback {
                    warn!(
                        "{} absolute steer encoder unavailable, using the relative encoder", 
                        self.corner
                    );
                    self.using_fallback = true;
                }

                match self.abs_reference {
                    Some(r) => maths::wrap_pi(r.heading_rad + relative_rad - r.relative_rad),
                    // Never had an absolute reading, the relative encoder's
                    // zero is the best we have
                    None => maths::wrap_pi(relative_rad)
                }
            }
        }
    }
}

impl ModuleIo for RealModuleIo {
    fn update_inputs(&mut self) -> Result<WheelMeasurement, DeviceError> {
        let drive_rotor_rad = self.drive.position_rad()?;
        let drive_rotor_rads = self.drive.velocity_rads()?;
        let relative_rad = self.relative_steer_rad()?;

        if !(drive_rotor_rad.is_finite() && drive_rotor_rads.is_finite() && relative_rad.is_finite()) {
            return Err(DeviceError::BadReading(format!("{} module", self.corner)));
        }

        let wheel_rad = self.drive_sign() * drive_rotor_rad / self.gearing.drive_gear_ratio;
        let wheel_rads = self.drive_sign() * drive_rotor_rads / self.gearing.drive_gear_ratio;

        let steer_heading_rad = self.read_heading(relative_rad);

        Ok(WheelMeasurement {
            drive_position_m: wheel_rad * self.gearing.wheel_radius_m,
            drive_velocity_rads: wheel_rads,
            steer_heading_rad,
            steer_absolute: !self.using_fallback
        })
    }

    fn set_drive_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        let v = self.drive_sign() * volts;
        self.drive.set_voltage(v)
    }

    fn set_steer_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        let v = self.steer_sign() * volts;
        self.steer.set_voltage(v)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Devices {
        drive_pos: f64,
        drive_vel: f64,
        drive_volts: f64,
        steer_pos: f64,
        steer_volts: f64,
        abs_connected: bool,
        abs_rot: f64,
        fail_reads: bool
    }

    type Shared = Arc<Mutex<Devices>>;

    struct MockDrive(Shared);
    struct MockSteer(Shared);
    struct MockAbs(Shared);

    impl Actuator for MockDrive {
        fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
            self.0.lock().unwrap().drive_volts = volts;
            Ok(())
        }
        fn position_rad(&self) -> Result<f64, DeviceError> {
            let d = self.0.lock().unwrap();
            if d.fail_reads {
                return Err(DeviceError::NoResponse("drive".into()));
            }
            Ok(d.drive_pos)
        }
        fn velocity_rads(&self) -> Result<f64, DeviceError> {
            Ok(self.0.lock().unwrap().drive_vel)
        }
    }

    impl Actuator for MockSteer {
        fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
            self.0.lock().unwrap().steer_volts = volts;
            Ok(())
        }
        fn position_rad(&self) -> Result<f64, DeviceError> {
            Ok(self.0.lock().unwrap().steer_pos)
        }
        fn velocity_rads(&self) -> Result<f64, DeviceError> {
            Ok(0.0)
        }
    }

    impl AbsoluteEncoder for MockAbs {
        fn is_connected(&self) -> bool {
            self.0.lock().unwrap().abs_connected
        }
        fn rotations(&self) -> Result<f64, DeviceError> {
            Ok(self.0.lock().unwrap().abs_rot)
        }
    }

    fn build(config: CornerConfig) -> (RealModuleIo, Shared) {
        let shared: Shared = Arc::new(Mutex::new(Devices::default()));
        let io = RealModuleIo::new(
            Corner::FrontLeft,
            config,
            ModuleGearing {
                drive_gear_ratio: 5.0,
                steer_gear_ratio: 10.0,
                wheel_radius_m: 0.05
            },
            ModuleDrivers {
                drive: Box::new(MockDrive(shared.clone())),
                steer: Box::new(MockSteer(shared.clone())),
                abs_encoder: Box::new(MockAbs(shared.clone()))
            }
        );
        (io, shared)
    }

    #[test]
    fn test_conversions_and_offsets() {
        let (mut io, dev) = build(CornerConfig {
            abs_encoder_offset_rot: 0.25,
            drive_inverted: true,
            steer_inverted: false
        });

        {
            let mut d = dev.lock().unwrap();
            d.abs_connected = true;
            d.abs_rot = 0.5;
            d.drive_pos = 50.0;
            d.drive_vel = 10.0;
        }

        let m = io.update_inputs().unwrap();
        assert!((m.steer_heading_rad - TAU * 0.25).abs() < 1e-12);
        assert!((m.drive_position_m + 50.0 / 5.0 * 0.05).abs() < 1e-12);
        assert!((m.drive_velocity_rads + 2.0).abs() < 1e-12);
        assert!(m.steer_absolute);

        io.set_drive_voltage(3.0).unwrap();
        io.set_steer_voltage(2.0).unwrap();
        assert_eq!(dev.lock().unwrap().drive_volts, -3.0);
        assert_eq!(dev.lock().unwrap().steer_volts, 2.0);
    }

    #[test]
    fn test_fallback_is_continuous() {
        let (mut io, dev) = build(CornerConfig::default());

        {
            let mut d = dev.lock().unwrap();
            d.abs_connected = true;
            d.abs_rot = 0.1;
            d.steer_pos = 7.0;
        }
        let m = io.update_inputs().unwrap();
        let before = m.steer_heading_rad;
        assert!((before - 0.1 * TAU).abs() < 1e-12);

        // Absolute encoder drops out, relative reading unchanged
        dev.lock().unwrap().abs_connected = false;
        let m = io.update_inputs().unwrap();
        assert!(!m.steer_absolute);
        assert!((m.steer_heading_rad - before).abs() < 1e-12);

        // Steering then moves by 0.2 rad at the wheel (2 rad at the rotor)
        dev.lock().unwrap().steer_pos = 9.0;
        let m = io.update_inputs().unwrap();
        assert!((m.steer_heading_rad - (before + 0.2)).abs() < 1e-12);

        // Reconnection returns to the absolute reading
        {
            let mut d = dev.lock().unwrap();
            d.abs_connected = true;
            d.abs_rot = 0.15;
        }
        let m = io.update_inputs().unwrap();
        assert!(m.steer_absolute);
        assert!((m.steer_heading_rad - 0.15 * TAU).abs() < 1e-12);
    }

    #[test]
    fn test_read_failure_propagates() {
        let (mut io, dev) = build(CornerConfig::default());
        dev.lock().unwrap().fail_reads = true;

        assert!(io.update_inputs().is_err());
    }
}
