//! # Cascade control
//!
//! Two nested loops: the outer loop's output becomes the inner loop's
//! setpoint each cycle, for example a position loop driving a velocity loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{Controller, ControlResult};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Measurements for both loops of a cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CascadeMeasurement {
    /// Measurement of the outer loop's controlled quantity
    pub outer: f64,

    /// Measurement of the inner loop's controlled quantity
    pub inner: f64
}

/// An outer controller feeding the setpoint of an inner controller.
#[derive(Debug, Clone)]
pub struct CascadeControl<O, I> {
    outer: O,
    inner: I,

    /// Setpoint given to the inner loop on the last calculation
    inner_setpoint: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<O, I> CascadeControl<O, I>
where
    O: Controller,
    I: Controller
{
    pub fn new(outer: O, inner: I) -> Self {
        Self {
            outer,
            inner,
            inner_setpoint: 0.0
        }
    }

    /// Step both loops. The outer output is evaluated immediately as it is
    /// the inner loop's setpoint for this cycle.
    pub fn calculate(
        &mut self, 
        setpoint: f64, 
        measurement: CascadeMeasurement
    ) -> ControlResult {
        self.inner_setpoint = self.outer.calculate(setpoint, measurement.outer).get();
        self.inner.calculate(self.inner_setpoint, measurement.inner)
    }

    /// Reset both loops.
    pub fn reset(&mut self) {
        self.outer.reset();
        self.inner.reset();
        self.inner_setpoint = 0.0;
    }

    pub fn inner_setpoint(&self) -> f64 {
        self.inner_setpoint
    }

    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::control::{PidController, PidGains};

    #[test]
    fn test_outer_feeds_inner() {
        let mut cascade = CascadeControl::new(
            PidController::new(PidGains::new(2.0, 0.0, 0.0), 0.02),
            PidController::new(PidGains::new(0.5, 0.0, 0.0), 0.02)
        );

        let out = cascade.calculate(
            1.0, 
            CascadeMeasurement { outer: 0.5, inner: 0.2 }
        ).get();

        // Outer: 2 * (1.0 - 0.5) = 1.0, inner: 0.5 * (1.0 - 0.2) = 0.4
        assert!((cascade.inner_setpoint() - 1.0).abs() < 1e-12);
        assert!((out - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_both() {
        let mut cascade = CascadeControl::new(
            PidController::new(PidGains::new(1.0, 1.0, 0.0), 0.1),
            PidController::new(PidGains::new(1.0, 1.0, 0.0), 0.1)
        );

        let m = CascadeMeasurement { outer: 0.0, inner: 0.0 };
        let first = cascade.calculate(1.0, m).get();
        let second = cascade.calculate(1.0, m).get();
        assert!(second > first);

        cascade.reset();
        assert_eq!(cascade.inner_setpoint(), 0.0);
        assert_eq!(cascade.outer().error(), 0.0);

        let after_reset = cascade.calculate(1.0, m).get();
        assert!((after_reset - first).abs() < 1e-12);
    }
}
