//! Swerve drive kinematics
//!
//! Each wheel's velocity is the chassis linear velocity plus the contribution
//! of the chassis rotation at the wheel's offset:
//!
//! ```text
//! vx_i = vx - w * y_i
//! vy_i = vy + w * x_i
//! ```
//!
//! Stacking the four wheels gives an 8x3 linear system. The inverse (wheel
//! states to body velocity) is its least squares solution, with the
//! pseudo-inverse computed once at construction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{DMatrix, DVector, Vector2};

// Internal
use super::*;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics of a four wheel swerve chassis.
///
/// Immutable after construction and free of cycle state, so it can be shared
/// by reference between the drivetrain and the pose estimator.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    /// Wheel contact point offsets from the centre of rotation.
    ///
    /// Units: meters,
    /// Frame: Body
    offsets_m: [Vector2<f64>; NUM_MODULES],

    /// Maps body velocity to stacked wheel velocity components (8x3).
    forward: DMatrix<f64>,

    /// Least squares inverse of `forward` (3x8).
    inverse: DMatrix<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Build the kinematics from the wheel offsets, in module order.
    pub fn new(offsets_m: [[f64; 2]; NUM_MODULES]) -> Result<Self, KinematicsError> {
        for (i, o) in offsets_m.iter().enumerate() {
            if !(o[0].is_finite() && o[1].is_finite()) {
                return Err(KinematicsError::NonFiniteOffset(i, *o));
            }
        }

        let mut rows = Vec::with_capacity(NUM_MODULES * 6);
        for o in offsets_m.iter() {
            rows.extend_from_slice(&[1.0, 0.0, -o[1]]);
            rows.extend_from_slice(&[0.0, 1.0, o[0]]);
        }
        let forward = DMatrix::from_row_slice(NUM_MODULES * 2, 3, &rows);

        let normal = forward.transpose() * &forward;

        // The normal matrix is singular when every wheel sits on the centre of
        // rotation, near singular when they are all very close to it
        let inverse = match normal.try_inverse() {
            Some(inv) if inv.iter().all(|v| v.is_finite()) => inv * forward.transpose(),
            _ => return Err(KinematicsError::MalformedGeometry(offsets_m))
        };

        let mut offsets = [Vector2::zeros(); NUM_MODULES];
        for (i, o) in offsets_m.iter().enumerate() {
            offsets[i] = Vector2::new(o[0], o[1]);
        }

        Ok(Self {
            offsets_m: offsets,
            forward,
            inverse
        })
    }

    /// The wheel offsets, in module order.
    pub fn offsets_m(&self) -> &[Vector2<f64>; NUM_MODULES] {
        &self.offsets_m
    }

    /// Distance from the centre of rotation to the furthest wheel.
    ///
    /// Units: meters
    pub fn drive_base_radius_m(&self) -> f64 {
        self.offsets_m
            .iter()
            .map(|o| o.norm())
            .fold(0.0, f64::max)
    }

    /// Wheel states which achieve the body velocity.
    ///
    /// Wheels which would be stationary point straight ahead.
    pub fn to_wheel_states(&self, velocity: &BodyVelocity) -> [WheelState; NUM_MODULES] {
        self.to_wheel_states_holding(velocity, &[0.0; NUM_MODULES])
    }

    /// Wheel states which achieve the body velocity, with stationary wheels
    /// keeping the corresponding heading in `held_headings_rad`.
    pub fn to_wheel_states_holding(
        &self, 
        velocity: &BodyVelocity, 
        held_headings_rad: &[f64; NUM_MODULES]
    ) -> [WheelState; NUM_MODULES] {
        let v = DVector::from_column_slice(&[
            velocity.forward_ms, velocity.strafe_ms, velocity.angular_rads
        ]);
        let wheel_vels = &self.forward * v;

        let mut states = [WheelState::default(); NUM_MODULES];

        for i in 0..NUM_MODULES {
            let vx = wheel_vels[2 * i];
            let vy = wheel_vels[2 * i + 1];
            let speed = vx.hypot(vy);

            states[i] = if speed < MIN_HEADING_SPEED_MS {
                WheelState::new(0.0, held_headings_rad[i])
            }
            else {
                WheelState::new(speed, vy.atan2(vx))
            };
        }

        trace!("Wheel states for {:?}: {:?}", velocity, states);

        states
    }

    /// Least squares body velocity which best explains the wheel states.
    pub fn to_body_velocity(&self, states: &[WheelState; NUM_MODULES]) -> BodyVelocity {
        let mut components = [0.0; NUM_MODULES * 2];

        for (i, s) in states.iter().enumerate() {
            let (sin, cos) = s.heading_rad.sin_cos();
            components[2 * i] = s.speed_ms * cos;
            components[2 * i + 1] = s.speed_ms * sin;
        }

        let v = self.solve(&components);

        BodyVelocity::new(v[0], v[1], v[2])
    }

    /// The body frame twist which best explains a set of per-wheel distance
    /// deltas, each paired with the wheel's current heading.
    pub fn to_twist(&self, deltas: &[WheelPosition; NUM_MODULES]) -> Twist {
        let mut components = [0.0; NUM_MODULES * 2];

        for (i, d) in deltas.iter().enumerate() {
            let (sin, cos) = d.heading_rad.sin_cos();
            components[2 * i] = d.distance_m * cos;
            components[2 * i + 1] = d.distance_m * sin;
        }

        let t = self.solve(&components);

        Twist::new(t[0], t[1], t[2])
    }

    fn solve(&self, components: &[f64; NUM_MODULES * 2]) -> [f64; 3] {
        let b = DVector::from_column_slice(components);
        let x = &self.inverse * b;

        [x[0], x[1], x[2]]
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale all wheel speeds by the same factor so that none exceeds
/// `max_speed_ms`.
///
/// Headings and the ratios between wheel speeds are unchanged, so the path of
/// the chassis keeps its shape.
pub fn desaturate(states: &mut [WheelState; NUM_MODULES], max_speed_ms: f64) {
    let max_commanded = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0, f64::max);

    if max_commanded > max_speed_ms {
        let scale = maths::clamp(&(max_speed_ms / max_commanded), &0.0, &1.0);

        for s in states.iter_mut() {
            s.speed_ms *= scale;
        }
    }
}

/// Correct a body velocity for being held constant over one period.
///
/// Commanding translation and rotation together for `dt_s` traces an arc
/// rather than the straight line intended. This returns the velocity whose
/// arc ends where holding the original velocity exactly would have taken the
/// chassis after `dt_s`.
pub fn discretize(velocity: &BodyVelocity, dt_s: f64) -> BodyVelocity {
    if !(dt_s > 0.0) {
        return *velocity;
    }

    let desired_delta = Vector2::new(velocity.forward_ms * dt_s, velocity.strafe_ms * dt_s);
    let twist = Twist::log(desired_delta, velocity.angular_rads * dt_s);

    BodyVelocity::new(
        twist.dx_m / dt_s,
        twist.dy_m / dt_s,
        twist.dtheta_rad / dt_s
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
