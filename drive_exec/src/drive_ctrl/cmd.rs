//! Commands passed into the drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the drivetrain.
///
/// `Velocity` and `HoldHeading` stay active, and are re-applied every cycle,
/// until another command replaces them. The others act once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DriveCmd {
    /// Drive at a velocity, in the body frame or (if `field_relative`) the
    /// field frame.
    Velocity {
        /// Units: meters/second
        forward_ms: f64,

        /// Units: meters/second
        strafe_ms: f64,

        /// Units: radians/second
        angular_rads: f64,

        #[serde(default)]
        field_relative: bool
    },

    /// Translate in the field frame while turning to and holding a heading.
    HoldHeading {
        /// Units: meters/second
        forward_ms: f64,

        /// Units: meters/second
        strafe_ms: f64,

        /// Units: radians
        heading_rad: f64
    },

    /// Zero speed, wheels keep their headings.
    Stop,

    /// Zero speed with the wheels turned to form an X, resisting being
    /// pushed.
    StopWithX,

    /// All wheels straight ahead at zero speed.
    Home,

    /// Make the current heading the new zero, keeping the position.
    ResetHeading,

    /// Re-seed the pose estimate.
    SetPose {
        /// Units: meters
        x_m: f64,

        /// Units: meters
        y_m: f64,

        /// Units: radians
        heading_rad: f64
    },

    /// Hold the wheels straight and apply an open loop drive voltage, for
    /// feedforward characterisation.
    Characterise {
        /// Units: volts
        volts: f64
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCmd {

    /// Determine if the command is valid (all values finite).
    pub fn is_valid(&self) -> bool {
        match *self {
            DriveCmd::Velocity { forward_ms, strafe_ms, angular_rads, .. } =>
                [forward_ms, strafe_ms, angular_rads].iter().all(|v| v.is_finite()),
            DriveCmd::HoldHeading { forward_ms, strafe_ms, heading_rad } =>
                [forward_ms, strafe_ms, heading_rad].iter().all(|v| v.is_finite()),
            DriveCmd::SetPose { x_m, y_m, heading_rad } =>
                [x_m, y_m, heading_rad].iter().all(|v| v.is_finite()),
            DriveCmd::Characterise { volts } => volts.is_finite(),
            DriveCmd::Stop 
            | DriveCmd::StopWithX 
            | DriveCmd::Home 
            | DriveCmd::ResetHeading => true
        }
    }

    /// True for commands which only change the pose estimate and so may run
    /// while the drivetrain is disabled.
    pub fn is_pose_cmd(&self) -> bool {
        matches!(self, DriveCmd::ResetHeading | DriveCmd::SetPose { .. })
    }

    /// True for commands which stay active and are re-applied each cycle.
    pub fn is_continuous(&self) -> bool {
        matches!(self, DriveCmd::Velocity { .. } | DriveCmd::HoldHeading { .. })
    }
}
