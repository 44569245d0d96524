//! Control primitives
//!
//! Generic closed loop building blocks used by the wheel modules and the
//! drivetrain. Every controller produces a [`ControlResult`] which can be
//! combined with other results (for instance feedback plus feedforward)
//! without either side knowing about the other.
//!
//! Controllers are stepped at a fixed period and must be called at most once
//! per cycle. A controller steps as soon as `calculate` is called and its
//! result holds that cycle's output. Only the combinators built on top of a
//! result are evaluated on read.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cascade;
mod feedforward;
mod gains;
mod pid;
mod profile;
mod result;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use cascade::*;
pub use feedforward::*;
pub use gains::*;
pub use pid::*;
pub use profile::*;
pub use result::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single input single output controller.
pub trait Controller {
    /// Step the controller towards `setpoint` given the current `measurement`.
    ///
    /// This updates the controller's internal state (integrator, previous
    /// error, profile) immediately and so must only be called once per cycle.
    /// The returned result is fixed at this cycle's output.
    fn calculate(&mut self, setpoint: f64, measurement: f64) -> ControlResult;

    /// Clear all internal state so that the next activation starts afresh.
    fn reset(&mut self);
}
