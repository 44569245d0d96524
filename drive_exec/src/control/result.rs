//! Composable control outputs

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The output of a controller, evaluated when read.
///
/// Combinators wrap the underlying evaluation rather than computing it, so a
/// chain such as `feedback.plus(feedforward).clamp(-12.0, 12.0)` is only
/// evaluated when [`ControlResult::get`] is called.
pub struct ControlResult {
    eval: Box<dyn Fn() -> f64 + Send>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlResult {
    /// A result which always evaluates to `value`.
    pub fn constant(value: f64) -> Self {
        Self::from_fn(move || value)
    }

    /// A result evaluated by calling `f`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + 'static
    {
        Self {
            eval: Box::new(f)
        }
    }

    /// Evaluate the result.
    pub fn get(&self) -> f64 {
        (self.eval)()
    }

    pub fn plus(self, other: ControlResult) -> Self {
        Self::from_fn(move || self.get() + other.get())
    }

    pub fn minus(self, other: ControlResult) -> Self {
        Self::from_fn(move || self.get() - other.get())
    }

    pub fn times(self, scale: f64) -> Self {
        Self::from_fn(move || self.get() * scale)
    }

    /// Divide the result by `divisor`. Division by zero evaluates to zero.
    pub fn divide(self, divisor: f64) -> Self {
        Self::from_fn(move || {
            if divisor == 0.0 {
                0.0
            }
            else {
                self.get() / divisor
            }
        })
    }

    pub fn negate(self) -> Self {
        Self::from_fn(move || -self.get())
    }

    /// Clamp the result into `[min, max]`.
    pub fn clamp(self, min: f64, max: f64) -> Self {
        Self::from_fn(move || maths::clamp(&self.get(), &min, &max))
    }

    /// Zero the result while its magnitude is not above `threshold`.
    pub fn with_deadband(self, threshold: f64) -> Self {
        Self::from_fn(move || maths::apply_deadband(self.get(), threshold))
    }
}

impl Default for ControlResult {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl From<f64> for ControlResult {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl fmt::Debug for ControlResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlResult({})", self.get())
    }
}

impl Add for ControlResult {
    type Output = ControlResult;

    fn add(self, rhs: ControlResult) -> ControlResult {
        self.plus(rhs)
    }
}

impl Sub for ControlResult {
    type Output = ControlResult;

    fn sub(self, rhs: ControlResult) -> ControlResult {
        self.minus(rhs)
    }
}

impl Mul<f64> for ControlResult {
    type Output = ControlResult;

    fn mul(self, rhs: f64) -> ControlResult {
        self.times(rhs)
    }
}

impl Neg for ControlResult {
    type Output = ControlResult;

    fn neg(self) -> ControlResult {
        self.negate()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
