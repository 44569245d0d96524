//! Implementations for the Drivetrain state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::f64::consts::PI;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// Internal
use util::{maths, module::State, time};
use crate::control::{MotionModelControl, ProfileState};
use crate::kinematics::{
    self, BodyVelocity, SwerveKinematics, WheelPosition, WheelState, NUM_MODULES
};
use crate::loc::{
    self, NoOrientationSensor, OrientationSensor, Pose, PoseEstimator, WarmupStage,
    WarmupStatus
};
use crate::module_ctrl::{
    Corner, ModuleConfig, ModuleDrivers, ModuleGains, ModuleGearing, ModuleIo, 
    RealModuleIo, SimModuleConfig, SimModuleIo, WheelModule
};
use super::{DriveCmd, DriveCtrlError, Params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drivetrain coordinator.
///
/// Owns the four wheel modules, the kinematics and the pose estimator. All
/// access happens from the control cycle.
pub struct Drivetrain {
    params: Params,

    kinematics: Arc<SwerveKinematics>,

    /// Modules in module order
    modules: Vec<WheelModule>,

    estimator: PoseEstimator,

    /// Heading each wheel keeps while it is commanded to zero speed.
    ///
    /// Units: radians
    held_headings_rad: [f64; NUM_MODULES],

    /// Angular rate controller used by `run_with_heading`, in radians.
    heading_lock: MotionModelControl,
    heading_lock_engaged: bool,

    /// Continuous command re-applied every cycle
    active_cmd: Option<DriveCmd>,

    /// Orientation sensor warm-up thread, joined once it has finished.
    warmup: Option<Warmup>,

    num_cycles: u64,

    report: StatusReport
}

/// The warm-up reset thread and the stage it has reached.
struct Warmup {
    handle: JoinHandle<()>,
    status: Arc<WarmupStatus>
}

/// Data required to build the drivetrain.
pub struct DrivetrainInit {
    pub params: Params,
    pub context: ExecContext
}

/// Input data to the drivetrain.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// True while the vehicle is disabled. All modules are stopped every cycle
    /// while this is set.
    pub disabled: bool,

    /// New command on this cycle, if any.
    pub cmd: Option<DriveCmd>
}

/// Output of one drivetrain cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OutputData {
    /// Time since the first cycle.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub pose: Pose,

    /// Achieved body velocity, from the measured wheel states
    pub chassis_speeds: BodyVelocity,

    /// Measured wheel states, in module order
    pub module_states: [WheelState; NUM_MODULES],

    /// Units: volts
    pub drive_volts: [f64; NUM_MODULES],

    /// Units: volts
    pub steer_volts: [f64; NUM_MODULES],

    pub sensor_connected: bool
}

/// Flat telemetry record for archiving, one per cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TelemetryRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub forward_ms: f64,
    pub strafe_ms: f64,
    pub angular_rads: f64,
    pub fl_speed_ms: f64,
    pub fl_heading_rad: f64,
    pub fl_drive_v: f64,
    pub fl_steer_v: f64,
    pub fr_speed_ms: f64,
    pub fr_heading_rad: f64,
    pub fr_drive_v: f64,
    pub fr_steer_v: f64,
    pub bl_speed_ms: f64,
    pub bl_heading_rad: f64,
    pub bl_drive_v: f64,
    pub bl_steer_v: f64,
    pub br_speed_ms: f64,
    pub br_heading_rad: f64,
    pub br_drive_v: f64,
    pub br_steer_v: f64,
    pub sensor_connected: bool
}

/// Status report for drivetrain processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub sensor_connected: bool,

    /// True for each module whose devices failed this cycle
    pub module_faults: [bool; NUM_MODULES],

    /// The command this cycle had a non-finite value and was rejected
    pub invalid_cmd: bool,

    /// The command this cycle was rejected because the vehicle is disabled
    pub cmd_ignored_disabled: bool,

    pub heading_lock_engaged: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the drivetrain runs. Chosen once at construction.
pub enum ExecContext {
    /// Simulated modules and no orientation sensor.
    Sim,

    /// Real devices. `modules` must be in module order, each is configured
    /// from its corner's entry in the parameters.
    Real {
        modules: Vec<ModuleDrivers>,
        sensor: Arc<dyn OrientationSensor>
    },

    /// Module input/output built by the caller, in module order. Used for
    /// hardware in the loop rigs.
    Custom {
        modules: Vec<Box<dyn ModuleIo>>,
        sensor: Arc<dyn OrientationSensor>
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Drivetrain {
    type InitData = DrivetrainInit;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Build the drivetrain from the parameters for the given context.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let DrivetrainInit { params, context } = init_data;

        params.are_valid()?;

        match context {
            ExecContext::Sim => {
                let sim_config = SimModuleConfig {
                    motor: params.motor,
                    drive_inertia_kgm2: params.sim_loads.drive_inertia_kgm2,
                    steer_inertia_kgm2: params.sim_loads.steer_inertia_kgm2,
                    drive_gear_ratio: params.drive_gear_ratio,
                    steer_gear_ratio: params.steer_gear_ratio,
                    wheel_radius_m: params.wheel_radius_m,
                    supply_voltage_v: params.supply_voltage_v,
                    period_s: params.cycle_period_s
                };

                let ios = (0..NUM_MODULES)
                    .map(|_| Box::new(SimModuleIo::new(&sim_config)) as Box<dyn ModuleIo>)
                    .collect();

                let gains = params.sim_gains;
                Self::build(params, ios, gains, Arc::new(NoOrientationSensor), None)
            },
            ExecContext::Real { modules, sensor } => {
                check_module_count(modules.len())?;

                let gearing = ModuleGearing {
                    drive_gear_ratio: params.drive_gear_ratio,
                    steer_gear_ratio: params.steer_gear_ratio,
                    wheel_radius_m: params.wheel_radius_m
                };

                let ios = modules
                    .into_iter()
                    .zip(Corner::ALL.iter())
                    .map(|(drivers, corner)| Box::new(RealModuleIo::new(
                        *corner, params.corners[corner.index()], gearing, drivers
                    )) as Box<dyn ModuleIo>)
                    .collect();

                let gains = params.real_gains;
                let warmup = spawn_warmup(&params, &sensor);
                Self::build(params, ios, gains, sensor, Some(warmup))
            },
            ExecContext::Custom { modules, sensor } => {
                let gains = params.real_gains;
                let warmup = spawn_warmup(&params, &sensor);
                Self::build(params, modules, gains, sensor, Some(warmup))
            }
        }
    }

    /// Process one cycle: handle the new command, apply the active one, then
    /// run the modules and update the pose.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();

        if let Some(cmd) = input_data.cmd {
            self.handle_cmd(cmd, input_data.disabled);
        }

        if input_data.disabled {
            self.active_cmd = None;
        }
        else if let Some(cmd) = self.active_cmd {
            self.apply_continuous(cmd);
        }

        let pose = self.periodic(input_data.disabled);

        let output = OutputData {
            time_s: time::cycle_time_s(self.num_cycles, self.params.cycle_period_s),
            pose,
            chassis_speeds: self.chassis_speeds(),
            module_states: self.module_states(),
            drive_volts: self.drive_volts(),
            steer_volts: self.steer_volts(),
            sensor_connected: self.is_sensor_connected()
        };

        self.num_cycles += 1;

        for (i, m) in self.modules.iter().enumerate() {
            self.report.module_faults[i] = m.is_faulted();
        }
        self.report.sensor_connected = output.sensor_connected;
        self.report.heading_lock_engaged = self.heading_lock_engaged;

        trace!("Drivetrain output: {:?}", output);

        Ok((output, self.report))
    }
}

impl Drivetrain {
    fn build(
        params: Params,
        ios: Vec<Box<dyn ModuleIo>>,
        gains: ModuleGains,
        sensor: Arc<dyn OrientationSensor>,
        warmup: Option<Warmup>
    ) -> Result<Self, DriveCtrlError> {
        check_module_count(ios.len())?;

        let kinematics = Arc::new(SwerveKinematics::new(params.wheel_offsets_m)?);

        let mut modules = Vec::with_capacity(NUM_MODULES);
        for (index, io) in ios.into_iter().enumerate() {
            let config = ModuleConfig {
                index,
                gains,
                wheel_radius_m: params.wheel_radius_m,
                supply_voltage_v: params.supply_voltage_v,
                period_s: params.cycle_period_s
            };
            modules.push(WheelModule::new(config, io)?);
        }

        let mut estimator = PoseEstimator::new(
            kinematics.clone(),
            sensor,
            params.fusion_mode,
            params.orientation_clockwise_positive
        );
        if let Some(ref w) = warmup {
            estimator.track_warmup(w.status.clone());
        }

        let mut heading_lock = MotionModelControl::new(
            params.heading_lock, params.cycle_period_s
        );
        heading_lock.enable_continuous_input(-PI, PI);

        info!(
            "Drivetrain built: max speed {:.3} m/s, max rate {:.3} rad/s, period {:.3} s",
            params.max_linear_speed_ms,
            params.max_linear_speed_ms / kinematics.drive_base_radius_m(),
            params.cycle_period_s
        );

        Ok(Self {
            params,
            kinematics,
            modules,
            estimator,
            held_headings_rad: [0.0; NUM_MODULES],
            heading_lock,
            heading_lock_engaged: false,
            active_cmd: None,
            warmup,
            num_cycles: 0,
            report: StatusReport::default()
        })
    }

    // ---- COMMANDS ----

    /// Drive at a body frame velocity.
    pub fn run_velocity(&mut self, velocity: BodyVelocity) {
        self.disengage_heading_lock();
        self.drive(&velocity);
    }

    /// Drive at a field frame velocity, rotated into the body frame by the
    /// estimated heading.
    pub fn run_field_velocity(&mut self, velocity: BodyVelocity) {
        let heading = self.current_pose().heading_rad;
        self.run_velocity(BodyVelocity::from_field_relative(velocity, heading));
    }

    /// Translate in the field frame while turning to and holding `heading_rad`.
    pub fn run_with_heading(&mut self, forward_ms: f64, strafe_ms: f64, heading_rad: f64) {
        let pose = self.current_pose();
        let current = pose.wrapped_heading_rad();

        if !self.heading_lock_engaged {
            self.heading_lock.reset_to(current, self.chassis_speeds().angular_rads);
            self.heading_lock_engaged = true;
            debug!("Heading lock engaged, target {:.4} rad", heading_rad);
        }

        self.heading_lock.set_goal(ProfileState::at_rest(maths::wrap_pi(heading_rad)));

        // Profile velocity as feedforward, the PID trims the position error
        let feedback = self.heading_lock.step(current);
        let angular_rads = feedback + self.heading_lock.setpoint().velocity;

        let field = BodyVelocity::new(forward_ms, strafe_ms, angular_rads);
        self.drive(&BodyVelocity::from_field_relative(field, pose.heading_rad));
    }

    /// Zero speed with every wheel keeping its heading.
    pub fn stop(&mut self) {
        self.run_velocity(BodyVelocity::zero());
    }

    /// Zero speed with the wheels in an X, each in line with the centre of
    /// rotation.
    pub fn stop_with_x(&mut self) {
        for (held, offset) in self.held_headings_rad
            .iter_mut()
            .zip(self.kinematics.offsets_m().iter())
        {
            *held = offset.y.atan2(offset.x);
        }

        self.stop();
    }

    /// All wheels straight ahead at zero speed.
    pub fn home_modules(&mut self) {
        self.disengage_heading_lock();
        self.held_headings_rad = [0.0; NUM_MODULES];

        for m in self.modules.iter_mut() {
            m.to_home();
        }
    }

    /// Make the current heading the new zero, keeping the position.
    pub fn reset_heading(&mut self) {
        let pose = self.current_pose();
        self.set_pose(Pose::new(pose.x_m(), pose.y_m(), 0.0));
    }

    /// Re-seed the pose estimate.
    pub fn set_pose(&mut self, pose: Pose) {
        let positions = self.module_positions();
        self.estimator.reset(pose, &positions);

        // The lock re-seeds from the new heading on its next use
        self.heading_lock_engaged = false;

        info!("Pose set to ({:.3}, {:.3}) m, {:.4} rad", pose.x_m(), pose.y_m(), pose.heading_rad);
    }

    /// Hold the wheels straight and apply an open loop drive voltage.
    pub fn run_characterisation(&mut self, drive_volts: f64) {
        self.disengage_heading_lock();
        self.held_headings_rad = [0.0; NUM_MODULES];

        for m in self.modules.iter_mut() {
            m.run_open_loop(0.0, drive_volts);
        }
    }

    /// Advance the modules and the pose estimate by one cycle.
    ///
    /// While `disabled` every module is stopped first, whatever was commanded.
    pub fn periodic(&mut self, disabled: bool) -> Pose {
        if disabled {
            self.disengage_heading_lock();
            for m in self.modules.iter_mut() {
                m.stop();
            }
        }

        self.check_warmup();

        for m in self.modules.iter_mut() {
            m.periodic();
        }

        let positions = self.module_positions();
        self.estimator.update(&positions)
    }

    // ---- GETTERS ----

    pub fn current_pose(&self) -> Pose {
        self.estimator.current_pose()
    }

    /// Achieved body velocity, least squares from the measured wheel states.
    pub fn chassis_speeds(&self) -> BodyVelocity {
        self.kinematics.to_body_velocity(&self.module_states())
    }

    pub fn module_states(&self) -> [WheelState; NUM_MODULES] {
        let mut states = [WheelState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = m.state();
        }
        states
    }

    pub fn module_positions(&self) -> [WheelPosition; NUM_MODULES] {
        let mut positions = [WheelPosition::default(); NUM_MODULES];
        for (p, m) in positions.iter_mut().zip(self.modules.iter()) {
            *p = m.position();
        }
        positions
    }

    /// Stored setpoint of each module, `None` where it is not driving closed
    /// loop.
    pub fn module_setpoints(&self) -> [Option<WheelState>; NUM_MODULES] {
        let mut setpoints = [None; NUM_MODULES];
        for (s, m) in setpoints.iter_mut().zip(self.modules.iter()) {
            *s = m.setpoint();
        }
        setpoints
    }

    /// Units: volts
    pub fn drive_volts(&self) -> [f64; NUM_MODULES] {
        let mut volts = [0.0; NUM_MODULES];
        for (v, m) in volts.iter_mut().zip(self.modules.iter()) {
            *v = m.drive_volts();
        }
        volts
    }

    /// Units: volts
    pub fn steer_volts(&self) -> [f64; NUM_MODULES] {
        let mut volts = [0.0; NUM_MODULES];
        for (v, m) in volts.iter_mut().zip(self.modules.iter()) {
            *v = m.steer_volts();
        }
        volts
    }

    /// Mean wheel angular velocity during characterisation.
    ///
    /// Units: radians/second
    pub fn characterisation_velocity(&self) -> f64 {
        self.modules
            .iter()
            .map(|m| m.characterisation_velocity())
            .sum::<f64>() / NUM_MODULES as f64
    }

    /// Units: meters/second
    pub fn max_linear_speed_ms(&self) -> f64 {
        self.params.max_linear_speed_ms
    }

    /// Rotation rate at which the outermost wheel reaches the maximum linear
    /// speed.
    ///
    /// Units: radians/second
    pub fn max_angular_speed_rads(&self) -> f64 {
        self.params.max_linear_speed_ms / self.kinematics.drive_base_radius_m()
    }

    pub fn is_sensor_connected(&self) -> bool {
        self.estimator.is_sensor_connected()
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    pub fn is_heading_lock_engaged(&self) -> bool {
        self.heading_lock_engaged
    }

    pub fn active_cmd(&self) -> Option<DriveCmd> {
        self.active_cmd
    }

    // ---- PRIVATE ----

    /// Convert a body velocity into module setpoints and dispatch them.
    fn drive(&mut self, velocity: &BodyVelocity) {
        let discrete = kinematics::discretize(velocity, self.params.cycle_period_s);

        let mut states = self.kinematics.to_wheel_states_holding(
            &discrete, &self.held_headings_rad
        );
        kinematics::desaturate(&mut states, self.params.max_linear_speed_ms);

        for (i, m) in self.modules.iter_mut().enumerate() {
            let optimised = m.run_setpoint(states[i]);
            self.held_headings_rad[i] = optimised.heading_rad;
        }
    }

    fn disengage_heading_lock(&mut self) {
        if self.heading_lock_engaged {
            debug!("Heading lock disengaged");
            self.heading_lock_engaged = false;
        }
    }

    /// Execute a new command.
    ///
    /// Continuous commands become the active command. One-shot commands act
    /// immediately and replace the active command, except for pose commands
    /// which leave it running.
    fn handle_cmd(&mut self, cmd: DriveCmd, disabled: bool) {
        if !cmd.is_valid() {
            warn!("Invalid drivetrain command rejected: {:?}", cmd);
            self.report.invalid_cmd = true;
            return;
        }

        if disabled && !cmd.is_pose_cmd() {
            warn!("Drivetrain command ignored while disabled: {:?}", cmd);
            self.report.cmd_ignored_disabled = true;
            return;
        }

        debug!("New drivetrain command: {:?}", cmd);

        if cmd.is_continuous() {
            self.active_cmd = Some(cmd);
            return;
        }

        if !cmd.is_pose_cmd() {
            self.active_cmd = None;
        }

        match cmd {
            DriveCmd::Stop => self.stop(),
            DriveCmd::StopWithX => self.stop_with_x(),
            DriveCmd::Home => self.home_modules(),
            DriveCmd::ResetHeading => self.reset_heading(),
            DriveCmd::SetPose { x_m, y_m, heading_rad } =>
                self.set_pose(Pose::new(x_m, y_m, heading_rad)),
            DriveCmd::Characterise { volts } => self.run_characterisation(volts),
            DriveCmd::Velocity { .. } | DriveCmd::HoldHeading { .. } => ()
        }
    }

    fn apply_continuous(&mut self, cmd: DriveCmd) {
        match cmd {
            DriveCmd::Velocity { forward_ms, strafe_ms, angular_rads, field_relative } => {
                let v = BodyVelocity::new(forward_ms, strafe_ms, angular_rads);
                if field_relative {
                    self.run_field_velocity(v);
                }
                else {
                    self.run_velocity(v);
                }
            },
            DriveCmd::HoldHeading { forward_ms, strafe_ms, heading_rad } =>
                self.run_with_heading(forward_ms, strafe_ms, heading_rad),
            _ => ()
        }
    }

    /// Join the warm-up thread once it has finished.
    ///
    /// The estimator follows the reset through the shared status. If the
    /// thread died mid-reset the status is moved on so the sensor is used
    /// again, with a fresh offset.
    fn check_warmup(&mut self) {
        let finished = match self.warmup {
            Some(ref w) => w.handle.is_finished(),
            None => false
        };

        if !finished {
            return;
        }

        if let Some(w) = self.warmup.take() {
            if w.handle.join().is_err() {
                warn!("Orientation sensor warm-up thread panicked");
                w.status.set(WarmupStage::Done);
            }
        }
    }
}

impl From<&OutputData> for TelemetryRecord {
    fn from(o: &OutputData) -> Self {
        let corner = |c: Corner| {
            let i = c.index();
            (o.module_states[i].speed_ms, o.module_states[i].heading_rad,
                o.drive_volts[i], o.steer_volts[i])
        };

        let (fl_speed_ms, fl_heading_rad, fl_drive_v, fl_steer_v) = corner(Corner::FrontLeft);
        let (fr_speed_ms, fr_heading_rad, fr_drive_v, fr_steer_v) = corner(Corner::FrontRight);
        let (bl_speed_ms, bl_heading_rad, bl_drive_v, bl_steer_v) = corner(Corner::BackLeft);
        let (br_speed_ms, br_heading_rad, br_drive_v, br_steer_v) = corner(Corner::BackRight);

        Self {
            time_s: o.time_s,
            x_m: o.pose.x_m(),
            y_m: o.pose.y_m(),
            heading_rad: o.pose.heading_rad,
            forward_ms: o.chassis_speeds.forward_ms,
            strafe_ms: o.chassis_speeds.strafe_ms,
            angular_rads: o.chassis_speeds.angular_rads,
            fl_speed_ms, fl_heading_rad, fl_drive_v, fl_steer_v,
            fr_speed_ms, fr_heading_rad, fr_drive_v, fr_steer_v,
            bl_speed_ms, bl_heading_rad, bl_drive_v, bl_steer_v,
            br_speed_ms, br_heading_rad, br_drive_v, br_steer_v,
            sensor_connected: o.sensor_connected
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_module_count(found: usize) -> Result<(), DriveCtrlError> {
    if found != NUM_MODULES {
        return Err(DriveCtrlError::WrongModuleCount {
            expected: NUM_MODULES,
            found
        });
    }

    Ok(())
}

fn spawn_warmup(params: &Params, sensor: &Arc<dyn OrientationSensor>) -> Warmup {
    let status = Arc::new(WarmupStatus::default());
    let handle = loc::spawn_warmup_reset(
        sensor.clone(),
        Duration::from_secs_f64(params.orientation_warmup_s),
        status.clone()
    );

    Warmup { handle, status }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
