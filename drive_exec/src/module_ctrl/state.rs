//! Implementations for the wheel module controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use util::maths;
use crate::control::{Controller, FeedforwardGains, PidController};
use crate::kinematics::{WheelPosition, WheelState};
use super::{Corner, DeviceError, ModuleConfig, ModuleError, ModuleIo, WheelMeasurement};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the module is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ModuleMode {
    /// No setpoint, both actuators held at zero volts.
    Idle,

    /// Heading servoed, drive at zero volts.
    Tracking { heading_rad: f64 },

    /// Heading and drive velocity both closed loop.
    Driving { heading_rad: f64, speed_ms: f64 },

    /// Heading servoed, drive at a fixed open loop voltage.
    OpenLoop { heading_rad: f64, drive_volts: f64 }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller for one wheel module.
pub struct WheelModule {
    corner: Corner,
    io: Box<dyn ModuleIo>,

    steer_pid: PidController,
    drive_pid: PidController,
    drive_ff: FeedforwardGains,

    /// Units: meters
    wheel_radius_m: f64,

    /// Units: volts
    supply_voltage_v: f64,

    mode: ModuleMode,

    /// Measurement from the last successful read
    measurement: WheelMeasurement,

    /// Voltages applied on the last cycle, after clamping
    drive_volts: f64,
    steer_volts: f64,

    /// True if the last cycle's device access failed
    faulted: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelModule {
    /// Build the module controller.
    ///
    /// An invalid index or non-physical configuration is an error, the module
    /// never runs degraded.
    pub fn new(config: ModuleConfig, io: Box<dyn ModuleIo>) -> Result<Self, ModuleError> {
        let corner = Corner::from_index(config.index)?;

        if !(config.wheel_radius_m.is_finite() && config.wheel_radius_m > 0.0) {
            return Err(ModuleError::InvalidConfig(
                corner, format!("wheel radius must be positive, got {}", config.wheel_radius_m)
            ));
        }
        if !(config.supply_voltage_v.is_finite() && config.supply_voltage_v > 0.0) {
            return Err(ModuleError::InvalidConfig(
                corner, format!("supply voltage must be positive, got {}", config.supply_voltage_v)
            ));
        }
        if !(config.period_s.is_finite() && config.period_s > 0.0) {
            return Err(ModuleError::InvalidConfig(
                corner, format!("period must be positive, got {}", config.period_s)
            ));
        }

        let mut steer_pid = PidController::new(config.gains.steer_pid, config.period_s);
        steer_pid.enable_continuous_input(-PI, PI);

        let drive_pid = PidController::new(config.gains.drive_pid, config.period_s);

        debug!("{} module built", corner);

        Ok(Self {
            corner,
            io,
            steer_pid,
            drive_pid,
            drive_ff: config.gains.drive_ff,
            wheel_radius_m: config.wheel_radius_m,
            supply_voltage_v: config.supply_voltage_v,
            mode: ModuleMode::Idle,
            measurement: WheelMeasurement::default(),
            drive_volts: 0.0,
            steer_volts: 0.0,
            faulted: false
        })
    }

    /// Command the wheel to a speed and heading.
    ///
    /// The state is optimised against the current heading before it is stored,
    /// and the optimised state is returned.
    pub fn run_setpoint(&mut self, state: WheelState) -> WheelState {
        let optimised = state.optimise(self.measurement.steer_heading_rad);

        self.mode = ModuleMode::Driving {
            heading_rad: optimised.heading_rad,
            speed_ms: optimised.speed_ms
        };

        optimised
    }

    /// Servo the heading only, with the drive unpowered.
    pub fn run_heading(&mut self, heading_rad: f64) {
        self.drive_pid.reset();
        self.mode = ModuleMode::Tracking {
            heading_rad: maths::wrap_pi(heading_rad)
        };
    }

    /// Servo the heading and apply an open loop drive voltage.
    pub fn run_open_loop(&mut self, heading_rad: f64, drive_volts: f64) {
        self.drive_pid.reset();
        self.mode = ModuleMode::OpenLoop {
            heading_rad: maths::wrap_pi(heading_rad),
            drive_volts
        };
    }

    /// Point straight ahead with zero speed.
    pub fn to_home(&mut self) {
        self.run_setpoint(WheelState::new(0.0, 0.0));
    }

    /// Clear the setpoint, reset both loops and zero both actuators.
    pub fn stop(&mut self) {
        if self.mode != ModuleMode::Idle {
            debug!("{} module stopped", self.corner);
        }

        self.mode = ModuleMode::Idle;
        self.steer_pid.reset();
        self.drive_pid.reset();
        self.apply(0.0, 0.0);
    }

    /// Run one control cycle: read the sensors, then compute and apply the
    /// actuator voltages for the current mode.
    pub fn periodic(&mut self) {
        match self.io.update_inputs() {
            Ok(m) => {
                if self.faulted {
                    info!("{} module sensors recovered", self.corner);
                    self.faulted = false;
                }
                self.measurement = m;
            },
            Err(e) => {
                self.handle_fault(&e);
                return;
            }
        }

        let measured_heading = self.measurement.steer_heading_rad;

        let (steer, drive) = match self.mode {
            ModuleMode::Idle => {
                self.steer_pid.reset();
                self.drive_pid.reset();
                (0.0, 0.0)
            },
            ModuleMode::Tracking { heading_rad } => {
                self.drive_pid.reset();
                let steer = self.steer_pid.calculate(heading_rad, measured_heading);
                (steer.get(), 0.0)
            },
            ModuleMode::OpenLoop { heading_rad, drive_volts } => {
                self.drive_pid.reset();
                let steer = self.steer_pid.calculate(heading_rad, measured_heading);
                (steer.get(), drive_volts)
            },
            ModuleMode::Driving { heading_rad, speed_ms } => {
                let steer = self.steer_pid.calculate(heading_rad, measured_heading);

                // Ramp the speed in as the heading converges
                let scaled_speed_ms = speed_ms * self.steer_pid.error().cos();
                let velocity_rads = scaled_speed_ms / self.wheel_radius_m;

                let drive = self.drive_ff.result(velocity_rads)
                    .plus(self.drive_pid.calculate(
                        velocity_rads, self.measurement.drive_velocity_rads
                    ));

                (steer.get(), drive.get())
            }
        };

        self.apply(steer, drive);

        trace!(
            "{} module: mode {:?}, heading {:.4} rad, speed {:.4} m/s, steer {:.3} V, drive {:.3} V",
            self.corner, self.mode, measured_heading, self.state().speed_ms,
            self.steer_volts, self.drive_volts
        );
    }

    /// Clamp the voltages to the supply and write them out.
    fn apply(&mut self, steer_volts: f64, drive_volts: f64) {
        let s = self.supply_voltage_v;

        // Non-finite commands (from non-finite gains) are never written
        let clamp = |v: f64| if v.is_finite() { maths::clamp(&v, &-s, &s) } else { 0.0 };

        self.steer_volts = clamp(steer_volts);
        self.drive_volts = clamp(drive_volts);

        let steer_result = self.io.set_steer_voltage(self.steer_volts);
        let drive_result = self.io.set_drive_voltage(self.drive_volts);

        if let Err(e) = steer_result.and(drive_result) {
            self.handle_fault(&e);
        }
    }

    /// Treat the module as stopped for this cycle, keeping the setpoint so it
    /// resumes once the devices respond again.
    fn handle_fault(&mut self, error: &DeviceError) {
        if !self.faulted {
            warn!("{} module device error, outputs zeroed: {}", self.corner, error);
            self.faulted = true;
        }

        self.steer_pid.reset();
        self.drive_pid.reset();
        self.steer_volts = 0.0;
        self.drive_volts = 0.0;

        // Best effort, the device may be the one which failed
        self.io.set_steer_voltage(0.0).ok();
        self.io.set_drive_voltage(0.0).ok();
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    pub fn mode(&self) -> ModuleMode {
        self.mode
    }

    /// The stored setpoint, `None` when not driving closed loop.
    pub fn setpoint(&self) -> Option<WheelState> {
        match self.mode {
            ModuleMode::Driving { heading_rad, speed_ms } => 
                Some(WheelState::new(speed_ms, heading_rad)),
            _ => None
        }
    }

    /// Measured speed and heading.
    pub fn state(&self) -> WheelState {
        WheelState::new(
            self.measurement.drive_velocity_rads * self.wheel_radius_m,
            self.measurement.steer_heading_rad
        )
    }

    /// Measured cumulative distance and heading.
    pub fn position(&self) -> WheelPosition {
        WheelPosition::new(
            self.measurement.drive_position_m,
            self.measurement.steer_heading_rad
        )
    }

    pub fn measurement(&self) -> WheelMeasurement {
        self.measurement
    }

    /// Units: volts
    pub fn drive_volts(&self) -> f64 {
        self.drive_volts
    }

    /// Units: volts
    pub fn steer_volts(&self) -> f64 {
        self.steer_volts
    }

    /// Wheel angular velocity, for feedforward characterisation.
    ///
    /// Units: radians/second
    pub fn characterisation_velocity(&self) -> f64 {
        self.measurement.drive_velocity_rads
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};
    use crate::control::PidGains;
    use crate::module_ctrl::ModuleGains;

    /// Records the voltages written and returns a scripted measurement.
    #[derive(Default)]
    struct Probe {
        measurement: WheelMeasurement,
        drive_volts: Vec<f64>,
        steer_volts: Vec<f64>,
        fail: bool
    }

    struct ProbeIo(Arc<Mutex<Probe>>);

    impl ModuleIo for ProbeIo {
        fn update_inputs(&mut self) -> Result<WheelMeasurement, DeviceError> {
            let p = self.0.lock().unwrap();
            if p.fail {
                Err(DeviceError::NoResponse("probe".into()))
            }
            else {
                Ok(p.measurement)
            }
        }

        fn set_drive_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
            self.0.lock().unwrap().drive_volts.push(volts);
            Ok(())
        }

        fn set_steer_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
            self.0.lock().unwrap().steer_volts.push(volts);
            Ok(())
        }
    }

    fn config(index: usize) -> ModuleConfig {
        ModuleConfig {
            index,
            gains: ModuleGains {
                steer_pid: PidGains::new(8.0, 0.0, 0.0),
                drive_pid: PidGains::new(0.05, 0.0, 0.0),
                drive_ff: FeedforwardGains::new(0.1, 0.1)
            },
            wheel_radius_m: 0.05,
            supply_voltage_v: 12.0,
            period_s: 0.02
        }
    }

    fn build() -> (WheelModule, Arc<Mutex<Probe>>) {
        let probe = Arc::new(Mutex::new(Probe::default()));
        let module = WheelModule::new(config(1), Box::new(ProbeIo(probe.clone()))).unwrap();
        (module, probe)
    }

    #[test]
    fn test_invalid_index() {
        let probe = Arc::new(Mutex::new(Probe::default()));
        match WheelModule::new(config(4), Box::new(ProbeIo(probe))) {
            Err(ModuleError::InvalidIndex(4)) => (),
            Err(e) => panic!("Expected an invalid index error, got {}", e),
            Ok(_) => panic!("Expected an invalid index error")
        }
    }

    #[test]
    fn test_setpoint_is_optimised() {
        let (mut module, probe) = build();
        probe.lock().unwrap().measurement.steer_heading_rad = 0.1;
        module.periodic();

        let opt = module.run_setpoint(WheelState::new(1.0, PI - 0.1));
        assert!((opt.speed_ms + 1.0).abs() < 1e-12);
        assert!((opt.heading_rad + 0.1).abs() < 1e-9);
        assert_eq!(module.setpoint(), Some(opt));
    }

    #[test]
    fn test_cosine_scaling() {
        let (mut module, probe) = build();

        // Aligned: full speed feedforward
        module.run_setpoint(WheelState::new(1.0, 0.0));
        module.periodic();
        let aligned = module.drive_volts();
        // ff: 0.1 + 0.1 * 20 rad/s, pid: 0.05 * 20 rad/s
        assert!((aligned - 3.1).abs() < 1e-9);

        // 60 degrees out: half the speed
        probe.lock().unwrap().measurement.steer_heading_rad = PI / 3.0;
        module.run_setpoint(WheelState::new(1.0, 0.0));
        module.periodic();
        assert!((module.drive_volts() - (0.1 + 0.15 * 10.0)).abs() < 1e-9);
        assert!(module.steer_volts() < 0.0);
    }

    #[test]
    fn test_voltage_is_clamped() {
        let (mut module, probe) = build();
        module.run_setpoint(WheelState::new(100.0, 0.0));
        module.periodic();

        assert_eq!(module.drive_volts(), 12.0);
        assert_eq!(*probe.lock().unwrap().drive_volts.last().unwrap(), 12.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut module, probe) = build();
        module.run_setpoint(WheelState::new(1.0, 0.5));
        module.periodic();
        assert!(module.drive_volts() != 0.0);

        module.stop();
        let first = (module.drive_volts(), module.steer_volts());
        module.stop();
        let second = (module.drive_volts(), module.steer_volts());

        assert_eq!(first, (0.0, 0.0));
        assert_eq!(first, second);
        assert_eq!(module.mode(), ModuleMode::Idle);
        assert_eq!(module.setpoint(), None);

        // Idle keeps writing zero volts
        module.periodic();
        let p = probe.lock().unwrap();
        assert_eq!(*p.drive_volts.last().unwrap(), 0.0);
        assert_eq!(*p.steer_volts.last().unwrap(), 0.0);
    }

    #[test]
    fn test_read_fault_stops_for_cycle() {
        let (mut module, probe) = build();
        module.run_setpoint(WheelState::new(1.0, 0.0));
        module.periodic();

        let last_good = module.measurement();

        probe.lock().unwrap().fail = true;
        module.periodic();
        assert!(module.is_faulted());
        assert_eq!(module.drive_volts(), 0.0);
        assert_eq!(module.measurement().drive_position_m, last_good.drive_position_m);
        assert_eq!(*probe.lock().unwrap().drive_volts.last().unwrap(), 0.0);

        // Setpoint is kept and the module resumes
        assert!(module.setpoint().is_some());
        probe.lock().unwrap().fail = false;
        module.periodic();
        assert!(!module.is_faulted());
        assert!(module.drive_volts() > 0.0);
    }

    #[test]
    fn test_open_loop_and_tracking() {
        let (mut module, probe) = build();

        module.run_open_loop(0.0, 4.0);
        module.periodic();
        assert_eq!(module.drive_volts(), 4.0);

        probe.lock().unwrap().measurement.steer_heading_rad = -0.2;
        module.run_heading(0.0);
        module.periodic();
        assert_eq!(module.drive_volts(), 0.0);
        assert!((module.steer_volts() - 1.6).abs() < 1e-9);
        assert_eq!(module.setpoint(), None);
    }
}
