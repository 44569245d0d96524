//! # Pose estimator
//!
//! Each cycle the per-wheel distance deltas are turned into a body frame twist
//! by the kinematics. The heading comes from the orientation sensor while it
//! is connected and from the twist's rotation while it is not. The position
//! always comes from the wheels, rotated into the field by the chosen heading.
//!
//! While the sensor's warm-up reset is in progress its readings are not used,
//! and the sensor offset is taken afresh from the first reading after it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Internal
use util::maths;
use crate::kinematics::{SwerveKinematics, Twist, WheelPosition, NUM_MODULES};
use super::{OrientationSensor, Pose, WarmupStage, WarmupStatus, sensor_heading_rad};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the orientation sensor and odometry headings are combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FusionMode {
    /// The sensor heading is used outright whenever it is connected.
    Switch,

    /// The odometry heading is corrected towards the sensor heading by
    /// `sensor_weight` (in `(0, 1]`) each cycle while it is connected.
    Blend { sensor_weight: f64 }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fuses wheel odometry and an orientation sensor into a field pose.
pub struct PoseEstimator {
    kinematics: Arc<SwerveKinematics>,
    sensor: Arc<dyn OrientationSensor>,
    mode: FusionMode,
    sensor_clockwise_positive: bool,

    pose: Pose,

    /// Wheel positions at the last update, `None` before the first one.
    last_positions: Option<[WheelPosition; NUM_MODULES]>,

    /// Field heading minus sensor heading. Set at reset, or on the first
    /// connected reading if the sensor was not connected at reset.
    sensor_offset_rad: Option<f64>,

    /// Sensor connection on the last update
    sensor_connected: bool,

    /// Warm-up reset being followed, dropped once it has been handled.
    warmup: Option<Arc<WarmupStatus>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FusionMode {
    fn default() -> Self {
        FusionMode::Switch
    }
}

impl PoseEstimator {
    pub fn new(
        kinematics: Arc<SwerveKinematics>,
        sensor: Arc<dyn OrientationSensor>,
        mode: FusionMode,
        sensor_clockwise_positive: bool
    ) -> Self {
        let connected = sensor.is_connected();

        let mut est = Self {
            kinematics,
            sensor,
            mode,
            sensor_clockwise_positive,
            pose: Pose::default(),
            last_positions: None,
            sensor_offset_rad: None,
            sensor_connected: connected,
            warmup: None
        };

        if connected {
            est.sensor_offset_rad = est.read_sensor().map(|s| -s);
        }

        info!(
            "Pose estimator using {:?} fusion, orientation sensor {}",
            mode,
            if connected { "connected" } else { "not connected" }
        );

        est
    }

    pub fn current_pose(&self) -> Pose {
        self.pose
    }

    pub fn fusion_mode(&self) -> FusionMode {
        self.mode
    }

    pub fn is_sensor_connected(&self) -> bool {
        self.sensor_connected
    }

    /// Follow the sensor's warm-up reset, see [`super::spawn_warmup_reset`].
    pub fn track_warmup(&mut self, status: Arc<WarmupStatus>) {
        self.warmup = Some(status);
    }

    /// Re-seed the estimate at `pose`.
    ///
    /// `positions` are the wheel positions now, which become the baseline for
    /// the next update's deltas.
    pub fn reset(&mut self, pose: Pose, positions: &[WheelPosition; NUM_MODULES]) {
        self.pose = pose;
        self.last_positions = Some(*positions);

        self.sensor_offset_rad = if self.sensor.is_connected() {
            self.read_sensor().map(|s| pose.heading_rad - s)
        }
        else {
            None
        };

        debug!("Pose estimator reset to {:?}", pose);
    }

    /// Advance the estimate with the latest wheel positions.
    pub fn update(&mut self, positions: &[WheelPosition; NUM_MODULES]) -> Pose {
        let last = match self.last_positions {
            Some(l) => l,
            None => {
                // First update, nothing to difference against yet. The sensor
                // is still read to keep the offset and connection current.
                self.last_positions = Some(*positions);
                self.sensor_field_heading();
                return self.pose;
            }
        };

        let mut deltas = [WheelPosition::default(); NUM_MODULES];
        for i in 0..NUM_MODULES {
            deltas[i] = WheelPosition::new(
                positions[i].distance_m - last[i].distance_m,
                positions[i].heading_rad
            );
        }
        self.last_positions = Some(*positions);

        let twist = self.kinematics.to_twist(&deltas);
        let odom_heading = self.pose.heading_rad + twist.dtheta_rad;

        let heading = match self.sensor_field_heading() {
            Some(sensor_heading) => match self.mode {
                FusionMode::Switch => sensor_heading,
                FusionMode::Blend { sensor_weight } => {
                    odom_heading + sensor_weight * (sensor_heading - odom_heading)
                }
            },
            None => odom_heading
        };

        let prev = self.pose;
        self.pose = prev.exp(&Twist::new(twist.dx_m, twist.dy_m, heading - prev.heading_rad));
        self.pose.heading_rad = heading;

        trace!("Pose update: twist {:?}, pose {:?}", twist, self.pose);

        self.pose
    }

    /// The sensor's heading in the field frame, unwrapped to be the nearest
    /// equivalent to the current heading, or `None` if the sensor is not
    /// connected.
    fn sensor_field_heading(&mut self) -> Option<f64> {
        let stage_before = self.warmup_stage();
        let connected = self.sensor.is_connected();
        let reading = if connected { self.read_sensor() } else { None };
        let stage_after = self.warmup_stage();

        match (self.sensor_connected, reading.is_some()) {
            (true, false) => warn!(
                "Orientation sensor disconnected, heading from odometry"
            ),
            (false, true) => info!("Orientation sensor connected"),
            _ => ()
        }
        self.sensor_connected = reading.is_some();

        let sensor_rad = reading?;

        match (stage_before, stage_after) {
            (None, None) 
                | (Some(WarmupStage::Waiting), Some(WarmupStage::Waiting)) => (),
            (Some(WarmupStage::Done), Some(WarmupStage::Done)) => {
                self.sensor_offset_rad = None;
                self.warmup = None;
                debug!("Orientation sensor offset taken after warm-up reset");
            },
            // The reading may straddle the reset
            _ => {
                trace!("Orientation sensor resetting, heading from odometry");
                return None;
            }
        }

        let prev = self.pose.heading_rad;
        let offset = *self.sensor_offset_rad.get_or_insert(prev - sensor_rad);

        Some(prev + maths::get_ang_dist(prev, sensor_rad + offset))
    }

    fn warmup_stage(&self) -> Option<WarmupStage> {
        self.warmup.as_ref().map(|w| w.stage())
    }

    /// Read the sensor in radians, `None` for a non-finite reading.
    fn read_sensor(&self) -> Option<f64> {
        let raw = self.sensor.heading_deg();

        if raw.is_finite() {
            Some(sensor_heading_rad(raw, self.sensor_clockwise_positive))
        }
        else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::sync::Mutex;
    use crate::loc::NoOrientationSensor;

    /// Counter-clockwise positive sensor with scripted readings.
    #[derive(Default)]
    struct ScriptedSensor {
        state: Mutex<(bool, f64)>
    }

    impl ScriptedSensor {
        fn set(&self, connected: bool, heading_deg: f64) {
            *self.state.lock().unwrap() = (connected, heading_deg);
        }
    }

    impl OrientationSensor for ScriptedSensor {
        fn is_connected(&self) -> bool {
            self.state.lock().unwrap().0
        }
        fn heading_deg(&self) -> f64 {
            self.state.lock().unwrap().1
        }
        fn reset(&self) {
            self.state.lock().unwrap().1 = 0.0;
        }
    }

    fn kinematics() -> Arc<SwerveKinematics> {
        Arc::new(SwerveKinematics::new([
            [0.35, 0.35],
            [0.35, -0.35],
            [-0.35, 0.35],
            [-0.35, -0.35]
        ]).unwrap())
    }

    /// Wheel positions after spinning the chassis by `angle` in place.
    fn spun(kin: &SwerveKinematics, start: &[WheelPosition; NUM_MODULES], angle: f64) 
        -> [WheelPosition; NUM_MODULES] 
    {
        let mut out = *start;
        for (i, o) in kin.offsets_m().iter().enumerate() {
            out[i] = WheelPosition::new(
                start[i].distance_m + angle * o.norm(),
                o.y.atan2(o.x) + FRAC_PI_2
            );
        }
        out
    }

    /// Wheel positions after driving straight along the body heading.
    fn driven(start: &[WheelPosition; NUM_MODULES], heading: f64, distance: f64) 
        -> [WheelPosition; NUM_MODULES] 
    {
        let mut out = *start;
        for p in out.iter_mut() {
            p.distance_m += distance;
            p.heading_rad = heading;
        }
        out
    }

    #[test]
    fn test_odometry_only_spin() {
        let kin = kinematics();
        let mut est = PoseEstimator::new(
            kin.clone(), Arc::new(NoOrientationSensor), FusionMode::Switch, false
        );

        // Spin at 1 rad/s for 10 cycles of 20 ms
        let mut positions = [WheelPosition::default(); NUM_MODULES];
        est.update(&positions);
        for _ in 0..10 {
            positions = spun(&kin, &positions, 0.02);
            est.update(&positions);
        }

        let heading = est.current_pose().heading_rad;
        assert!((heading - 0.2).abs() < 0.01);
        assert!(est.current_pose().position_m.norm() < 1e-9);
        assert!(!est.is_sensor_connected());
    }

    #[test]
    fn test_sensor_is_authoritative_for_heading_only() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 0.0);
        let mut est = PoseEstimator::new(kin.clone(), sensor.clone(), FusionMode::Switch, false);

        let mut positions = [WheelPosition::default(); NUM_MODULES];
        est.update(&positions);

        // Wheels report straight driving, sensor says the chassis faces +Y
        sensor.set(true, 90.0);
        positions = driven(&positions, 0.0, 1.0);
        let pose = est.update(&positions);

        assert!((pose.heading_rad - FRAC_PI_2).abs() < 1e-9);
        // Translation is still 1 m, along an arc ending at +90 degrees
        assert!((pose.position_m.norm() - (2.0 * 2.0f64.sqrt() / PI)).abs() < 1e-9);
    }

    #[test]
    fn test_fusion_continuity_on_dropout() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 0.0);
        let mut est = PoseEstimator::new(kin.clone(), sensor.clone(), FusionMode::Switch, false);

        let mut positions = [WheelPosition::default(); NUM_MODULES];
        est.update(&positions);

        // Connected update, sensor reads 30 degrees
        sensor.set(true, 30.0);
        positions = spun(&kin, &positions, 0.01);
        let h1 = est.update(&positions).heading_rad;
        assert!((h1 - 30f64.to_radians()).abs() < 1e-9);

        // Disconnected update, the sensor's stale value must not be used
        sensor.set(false, 170.0);
        let dtheta = 0.05;
        positions = spun(&kin, &positions, dtheta);
        let h2 = est.update(&positions).heading_rad;

        assert!((h2 - (h1 + dtheta)).abs() < 1e-9);
        assert!(!est.is_sensor_connected());
    }

    #[test]
    fn test_sensor_unwrapped_across_seam() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 170.0);
        let mut est = PoseEstimator::new(kin.clone(), sensor.clone(), FusionMode::Switch, false);

        let positions = [WheelPosition::default(); NUM_MODULES];
        est.reset(Pose::new(0.0, 0.0, 170f64.to_radians()), &positions);
        est.update(&positions);

        // Sensor wraps from +179 to -179, the heading keeps increasing
        sensor.set(true, 179.0);
        est.update(&positions);
        sensor.set(true, -179.0);
        let h = est.update(&positions).heading_rad;

        assert!((h - 181f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_reset_resyncs_baseline() {
        let kin = kinematics();
        let mut est = PoseEstimator::new(
            kin, Arc::new(NoOrientationSensor), FusionMode::Switch, false
        );

        let start = [WheelPosition::default(); NUM_MODULES];
        est.update(&start);

        // Wheels move 5 m, then the pose is reset before the next update
        let moved = driven(&start, 0.0, 5.0);
        est.reset(Pose::new(1.0, 1.0, 0.0), &moved);

        // The first update after reset sees no motion
        let pose = est.update(&moved);
        assert!((pose.x_m() - 1.0).abs() < 1e-12);
        assert!((pose.y_m() - 1.0).abs() < 1e-12);

        let pose = est.update(&driven(&moved, 0.0, 0.5));
        assert!((pose.x_m() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_keeps_sensor_relative() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 45.0);
        let mut est = PoseEstimator::new(kin, sensor.clone(), FusionMode::Switch, false);

        let positions = [WheelPosition::default(); NUM_MODULES];
        est.reset(Pose::new(0.0, 0.0, 0.0), &positions);

        sensor.set(true, 55.0);
        let h = est.update(&positions).heading_rad;
        assert!((h - 10f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_warmup_reset_keeps_heading() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 90.0);
        let mut est = PoseEstimator::new(kin.clone(), sensor.clone(), FusionMode::Switch, false);

        let status = Arc::new(WarmupStatus::default());
        est.track_warmup(status.clone());

        let mut positions = [WheelPosition::default(); NUM_MODULES];
        assert_eq!(est.update(&positions).heading_rad, 0.0);

        // The sensor zeroes while the reset is in progress, the chassis spins
        status.set(WarmupStage::Resetting);
        sensor.reset();
        positions = spun(&kin, &positions, 0.05);
        let h = est.update(&positions).heading_rad;
        assert!((h - 0.05).abs() < 1e-9);
        assert!(est.is_sensor_connected());

        // After the reset the offset is taken against the current heading
        status.set(WarmupStage::Done);
        let h = est.update(&positions).heading_rad;
        assert!((h - 0.05).abs() < 1e-9);

        sensor.set(true, 10.0);
        let h = est.update(&positions).heading_rad;
        assert!((h - (0.05 + 10f64.to_radians())).abs() < 1e-9);
    }

    #[test]
    fn test_blend() {
        let kin = kinematics();
        let sensor = Arc::new(ScriptedSensor::default());
        sensor.set(true, 0.0);
        let mut est = PoseEstimator::new(
            kin, sensor.clone(), FusionMode::Blend { sensor_weight: 0.25 }, false
        );
        assert_eq!(est.fusion_mode(), FusionMode::Blend { sensor_weight: 0.25 });

        let positions = [WheelPosition::default(); NUM_MODULES];
        est.update(&positions);

        // Wheels report no rotation, sensor reports 40 degrees
        sensor.set(true, 40.0);
        let h = est.update(&positions).heading_rad;
        assert!((h - 10f64.to_radians()).abs() < 1e-9);

        let h = est.update(&positions).heading_rad;
        assert!((h - 17.5f64.to_radians()).abs() < 1e-9);
    }
}
