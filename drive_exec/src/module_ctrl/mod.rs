//! # Wheel module control
//!
//! Each wheel module has a drive actuator, which spins the wheel, and a steer
//! actuator, which sets its heading. The module controller turns a wheel state
//! setpoint into per-cycle voltages using a heading PID (continuous over the
//! full circle) and a drive velocity PID plus feedforward.
//!
//! Hardware access goes through the [`ModuleIo`] trait, implemented once for
//! simulation ([`SimModuleIo`]) and once for real devices ([`RealModuleIo`]),
//! so the control maths is the same in both cases.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod io;
mod params;
mod real;
mod sim;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

pub use io::*;
pub use params::*;
pub use real::*;
pub use sim::*;
pub use state::*;

use crate::kinematics::NUM_MODULES;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The corner of the chassis a module is mounted on.
///
/// The order of the variants is the module order used everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight
}

/// Errors raised while building a module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Invalid module index {0}, expected 0 to 3")]
    InvalidIndex(usize),

    #[error("Invalid module configuration for {0}: {1}")]
    InvalidConfig(Corner, String)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Corner {
    /// All corners in module order.
    pub const ALL: [Corner; NUM_MODULES] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::BackLeft,
        Corner::BackRight
    ];

    pub fn from_index(index: usize) -> Result<Self, ModuleError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ModuleError::InvalidIndex(index))
    }

    pub fn index(&self) -> usize {
        match self {
            Corner::FrontLeft => 0,
            Corner::FrontRight => 1,
            Corner::BackLeft => 2,
            Corner::BackRight => 3
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Corner::FrontLeft => "FL",
            Corner::FrontRight => "FR",
            Corner::BackLeft => "BL",
            Corner::BackRight => "BR"
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_corner_index() {
        for (i, c) in Corner::ALL.iter().enumerate() {
            assert_eq!(Corner::from_index(i).unwrap(), *c);
            assert_eq!(c.index(), i);
        }

        match Corner::from_index(4) {
            Err(ModuleError::InvalidIndex(4)) => (),
            r => panic!("Expected an invalid index error, got {:?}", r)
        }
    }
}
