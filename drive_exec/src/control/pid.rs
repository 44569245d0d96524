//! # PID controller
//!
//! A fixed period PID controller with optional continuous (wrapping) input,
//! used for wheel headings where the error must always be the shortest signed
//! distance around the circle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use util::maths;
use super::{Controller, ControlResult, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller stepped at a fixed period.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    gains: PidGains,

    /// Time between calls to `calculate`.
    ///
    /// Units: seconds
    period_s: f64,

    /// Range over which the input wraps, if continuous input is enabled.
    continuous_range: Option<(f64, f64)>,

    /// Limits on the integral contribution (`k_i * integral`).
    integrator_range: (f64, f64),

    /// Previous error, `None` after construction or reset.
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,

    /// Error of the last calculation
    error: f64,

    /// Error rate of the last calculation
    error_rate: f64,

    setpoint: f64,
    measurement: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains, stepped every `period_s`
    /// seconds.
    pub fn new(gains: PidGains, period_s: f64) -> Self {
        Self {
            gains,
            period_s,
            continuous_range: None,
            integrator_range: (-1.0, 1.0),
            prev_error: None,
            integral: 0.0,
            error: 0.0,
            error_rate: 0.0,
            setpoint: 0.0,
            measurement: 0.0
        }
    }

    /// Treat the input as wrapping over `[min, max)`.
    ///
    /// The error then becomes the signed shortest distance between setpoint
    /// and measurement, never more than half the range in magnitude.
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.continuous_range = Some((min, max));
    }

    pub fn is_continuous_input_enabled(&self) -> bool {
        self.continuous_range.is_some()
    }

    /// Limit the integral contribution to the output to `[min, max]`.
    pub fn set_integrator_range(&mut self, min: f64, max: f64) {
        self.integrator_range = (min, max);
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    /// Error of the last calculation.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Rate of change of the error in the last calculation.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn measurement(&self) -> f64 {
        self.measurement
    }

    /// True if the last error was within `tolerance` of zero.
    pub fn at_setpoint(&self, tolerance: f64) -> bool {
        self.error.abs() <= tolerance
    }

    /// Compute the error between a setpoint and measurement, wrapping if
    /// continuous input is enabled.
    pub fn compute_error(&self, setpoint: f64, measurement: f64) -> f64 {
        match self.continuous_range {
            Some((min, max)) => {
                let bound = (max - min) / 2.0;
                maths::input_modulus(setpoint - measurement, -bound, bound)
            },
            None => setpoint - measurement
        }
    }

    /// Step the controller and return the output as a plain number.
    pub fn step(&mut self, setpoint: f64, measurement: f64) -> f64 {
        self.setpoint = setpoint;
        self.measurement = measurement;

        let error = self.compute_error(setpoint, measurement);

        // No derivative on the first step after a reset, otherwise the whole
        // error would appear as a single period spike
        let error_rate = match self.prev_error {
            Some(e) if self.period_s > 0.0 => (error - e) / self.period_s,
            _ => 0.0
        };

        // Accumulate the integral, keeping the contribution within range
        if self.gains.k_i != 0.0 {
            let (min, max) = self.integrator_range;
            self.integral = maths::clamp(
                &(self.integral + error * self.period_s),
                &(min / self.gains.k_i),
                &(max / self.gains.k_i)
            );
        }

        self.error = error;
        self.error_rate = error_rate;
        self.prev_error = Some(error);

        self.gains.k_p * error
            + self.gains.k_i * self.integral
            + self.gains.k_d * error_rate
    }
}

impl Controller for PidController {
    fn calculate(&mut self, setpoint: f64, measurement: f64) -> ControlResult {
        ControlResult::constant(self.step(setpoint, measurement))
    }

    fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0.0;
        self.error = 0.0;
        self.error_rate = 0.0;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
