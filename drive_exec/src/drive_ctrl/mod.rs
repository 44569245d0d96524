//! Drivetrain control module
//!
//! The drivetrain owns the four wheel modules, the kinematics and the pose
//! estimator, exposes the body velocity command surface and advances
//! everything once per control cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use params::*;
pub use state::*;

use crate::{kinematics::KinematicsError, module_ctrl::ModuleError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while building the drivetrain.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drivetrain parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Invalid wheel geometry: {0}")]
    Geometry(#[from] KinematicsError),

    #[error("Could not build a wheel module: {0}")]
    Module(#[from] ModuleError),

    #[error("Expected {expected} module IO backends, found {found}")]
    WrongModuleCount { expected: usize, found: usize }
}
