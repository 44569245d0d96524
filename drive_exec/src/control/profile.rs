//! # Trapezoidal motion profiles
//!
//! A velocity and acceleration limited profile generator, and the motion model
//! controller which runs a PID against the profile's moving setpoint instead
//! of stepping straight to the goal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use util::maths;
use super::{Controller, ControlResult, MotionGains, PidController, ProfileConstraints};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on a motion profile.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64
}

/// Trapezoidal profile generator.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrapezoidProfile {
    constraints: ProfileConstraints
}

/// A PID controller which follows a trapezoidal profile towards its goal.
#[derive(Debug, Clone, Serialize)]
pub struct MotionModelControl {
    pid: PidController,
    profile: TrapezoidProfile,

    /// The final state the profile is heading to
    goal: ProfileState,

    /// The current point on the profile
    setpoint: ProfileState,

    /// Range over which the input wraps, if continuous input is enabled.
    continuous_range: Option<(f64, f64)>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    /// A state at rest at `position`.
    pub fn at_rest(position: f64) -> Self {
        Self::new(position, 0.0)
    }

    fn scaled(&self, direction: f64) -> Self {
        Self::new(self.position * direction, self.velocity * direction)
    }
}

impl TrapezoidProfile {
    pub fn new(constraints: ProfileConstraints) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> ProfileConstraints {
        self.constraints
    }

    /// The state of the profile `t` seconds after `current`, when travelling
    /// to `goal`.
    pub fn calculate(&self, t: f64, current: ProfileState, goal: ProfileState) -> ProfileState {
        let max_vel = self.constraints.max_velocity;
        let max_acc = self.constraints.max_acceleration;

        // Work in the direction of travel so the profile is always "forwards"
        let direction = if current.position > goal.position { -1.0 } else { 1.0 };
        let mut current = current.scaled(direction);
        let goal = goal.scaled(direction);

        if current.velocity > max_vel {
            current.velocity = max_vel;
        }

        // Distances as if the profile had started and ended at rest
        let cutoff_begin = current.velocity / max_acc;
        let cutoff_dist_begin = cutoff_begin * cutoff_begin * max_acc / 2.0;

        let cutoff_end = goal.velocity / max_acc;
        let cutoff_dist_end = cutoff_end * cutoff_end * max_acc / 2.0;

        let full_trapezoid_dist = (cutoff_dist_begin 
            + (goal.position - current.position) 
            + cutoff_dist_end).max(0.0);
        let mut accel_time = max_vel / max_acc;

        let mut full_speed_dist = full_trapezoid_dist - accel_time * accel_time * max_acc;

        // Triangular profile, the top speed is never reached
        if full_speed_dist < 0.0 {
            accel_time = (full_trapezoid_dist / max_acc).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel = accel_time - cutoff_begin;
        let end_full_speed = end_accel + full_speed_dist / max_vel;
        let end_decel = end_full_speed + accel_time - cutoff_end;

        let mut result = current;

        if t < end_accel {
            result.velocity += t * max_acc;
            result.position += (current.velocity + t * max_acc / 2.0) * t;
        }
        else if t < end_full_speed {
            result.velocity = max_vel;
            result.position += (current.velocity + end_accel * max_acc / 2.0) * end_accel
                + max_vel * (t - end_accel);
        }
        else if t <= end_decel {
            let time_left = end_decel - t;
            result.velocity = goal.velocity + time_left * max_acc;
            result.position = goal.position - (goal.velocity + time_left * max_acc / 2.0) * time_left;
        }
        else {
            result = goal;
        }

        result.scaled(direction)
    }
}

impl MotionModelControl {
    pub fn new(gains: MotionGains, period_s: f64) -> Self {
        Self {
            pid: PidController::new(gains.pid(), period_s),
            profile: TrapezoidProfile::new(gains.constraints()),
            goal: ProfileState::default(),
            setpoint: ProfileState::default(),
            continuous_range: None
        }
    }

    /// Treat the input as wrapping over `[min, max)`.
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.pid.enable_continuous_input(min, max);
        self.continuous_range = Some((min, max));
    }

    /// Set the goal the profile approaches.
    pub fn set_goal(&mut self, goal: ProfileState) {
        self.goal = goal;
    }

    pub fn goal(&self) -> ProfileState {
        self.goal
    }

    /// The current point on the profile.
    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// Error between the profile setpoint and the last measurement.
    pub fn error(&self) -> f64 {
        self.pid.error()
    }

    /// True if the goal is reached and the profile has finished.
    pub fn at_goal(&self, tolerance: f64) -> bool {
        self.pid.at_setpoint(tolerance) 
            && (self.goal.position - self.setpoint.position).abs() <= tolerance
            && (self.goal.velocity - self.setpoint.velocity).abs() <= tolerance
    }

    /// Re-seed the profile at the given state, clearing the PID.
    ///
    /// Call this when (re)engaging the controller so that the profile starts
    /// from where the mechanism actually is.
    pub fn reset_to(&mut self, position: f64, velocity: f64) {
        self.pid.reset();
        self.setpoint = ProfileState::new(position, velocity);
    }

    /// Advance the profile one period and step the PID against it.
    pub fn step(&mut self, measurement: f64) -> f64 {
        // Move the goal and setpoint to be the shortest way round from the
        // measurement
        if let Some((min, max)) = self.continuous_range {
            let bound = (max - min) / 2.0;
            let goal_dist = maths::input_modulus(
                self.goal.position - measurement, -bound, bound
            );
            let setpoint_dist = maths::input_modulus(
                self.setpoint.position - measurement, -bound, bound
            );

            self.goal.position = measurement + goal_dist;
            self.setpoint.position = measurement + setpoint_dist;
        }

        self.setpoint = self.profile.calculate(
            self.pid.period_s(), self.setpoint, self.goal
        );

        self.pid.step(self.setpoint.position, measurement)
    }
}

impl Controller for MotionModelControl {
    /// Set the goal to `setpoint` at rest and step towards it.
    fn calculate(&mut self, setpoint: f64, measurement: f64) -> ControlResult {
        self.set_goal(ProfileState::at_rest(setpoint));
        ControlResult::constant(self.step(measurement))
    }

    /// Reset the PID and re-seed the profile at its current setpoint.
    fn reset(&mut self) {
        let sp = self.setpoint;
        self.reset_to(sp.position, sp.velocity);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn constraints() -> ProfileConstraints {
        ProfileConstraints {
            max_velocity: 2.0,
            max_acceleration: 4.0
        }
    }

    #[test]
    fn test_profile_limits() {
        let profile = TrapezoidProfile::new(constraints());
        let goal = ProfileState::at_rest(5.0);
        let mut state = ProfileState::default();

        let dt = 0.01;
        let mut prev = state;
        for _ in 0..500 {
            state = profile.calculate(dt, state, goal);
            assert!(state.velocity <= 2.0 + 1e-9);
            assert!((state.velocity - prev.velocity).abs() <= 4.0 * dt + 1e-9);
            assert!(state.position >= prev.position - 1e-9);
            prev = state;
        }

        // 5 m at 2 m/s with 0.5 s ramps takes 3 s
        assert!((state.position - 5.0).abs() < 1e-9);
        assert_eq!(state.velocity, 0.0);
    }

    #[test]
    fn test_profile_reverse_and_triangular() {
        let profile = TrapezoidProfile::new(constraints());

        // Backwards move
        let s = profile.calculate(0.1, ProfileState::default(), ProfileState::at_rest(-5.0));
        assert!((s.velocity + 0.4).abs() < 1e-9);
        assert!((s.position + 0.02).abs() < 1e-9);

        // Short move never reaches full speed, peak velocity sqrt(a * d)
        let goal = ProfileState::at_rest(0.25);
        let mut state = ProfileState::default();
        let mut peak: f64 = 0.0;
        for _ in 0..200 {
            state = profile.calculate(0.005, state, goal);
            peak = peak.max(state.velocity);
        }
        assert!(peak < 1.0 + 1e-6);
        assert!((state.position - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_motion_model_continuous() {
        let mut ctrl = MotionModelControl::new(
            MotionGains::new(5.0, 0.0, 0.0, 8.0, 20.0), 0.02
        );
        ctrl.enable_continuous_input(-PI, PI);
        ctrl.reset_to(PI - 0.1, 0.0);

        // Goal is just across the seam, so the output must be positive (the 
        // short way round) rather than a full turn negative
        let out = ctrl.calculate(-PI + 0.1, PI - 0.1).get();
        assert!(out > 0.0);
        assert!(ctrl.setpoint().velocity > 0.0);
    }

    #[test]
    fn test_motion_model_converges() {
        let mut ctrl = MotionModelControl::new(
            MotionGains::new(5.0, 0.0, 0.0, 8.0, 20.0), 0.02
        );
        ctrl.reset_to(0.0, 0.0);
        ctrl.set_goal(ProfileState::at_rest(1.0));

        // Integrate a perfect rate plant
        let mut position = 0.0;
        for _ in 0..200 {
            let rate = ctrl.step(position) + ctrl.setpoint().velocity;
            position += rate * 0.02;
        }

        assert!((position - 1.0).abs() < 1e-3);
        assert!(ctrl.at_goal(1e-3));
    }
}
