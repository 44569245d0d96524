//! # Kinematics module
//!
//! Converts between the body velocity of the chassis and the states of the
//! four wheels, given the fixed position of each wheel relative to the centre
//! of rotation.
//!
//! Frames: the body frame has +X forwards and +Y to the left, with positive
//! rotation counter-clockwise when viewed from above. Wheel headings are
//! measured counter-clockwise from the body +X axis.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod states;
mod swerve;
mod twist;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use states::*;
pub use swerve::*;
pub use twist::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of wheel modules on the chassis.
pub const NUM_MODULES: usize = 4;

/// Wheels commanded slower than this keep their held heading.
///
/// Units: meters/second
pub const MIN_HEADING_SPEED_MS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in constructing the kinematics.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("Wheel offset {0} is not finite: {1:?}")]
    NonFiniteOffset(usize, [f64; 2]),

    #[error(
        "The wheel geometry is degenerate, body velocity cannot be recovered \
        from wheel states (offsets: {0:?})")]
    MalformedGeometry([[f64; 2]; NUM_MODULES])
}
