//! # Drive library.
//!
//! The motion core of a four wheel swerve drive: control primitives, wheel
//! module control, kinematics, pose estimation and the drivetrain coordinator
//! which ties them together once per control cycle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control primitives - PID, feedforward, motion profiles and composable control results
pub mod control;

/// Kinematics - converts between body velocities and wheel states
pub mod kinematics;

/// Wheel module control - drives one wheel to its commanded speed and heading
pub mod module_ctrl;

/// Localisation - pose estimation from wheel odometry and an orientation sensor
pub mod loc;

/// Drivetrain control - owns the modules and estimator, exposes the command surface
pub mod drive_ctrl;

/// Data store for the executable
pub mod data_store;
