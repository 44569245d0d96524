//! # Telecommand processor module
//!
//! The telecommand processor handles the commands coming from the script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Deserialize;

// Internal
use drive_lib::{
    data_store::{DataStore, DisableCause},
    drive_ctrl::DriveCmd
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the executable.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum ExecCmd {
    Mode(ModeCmd),
    Drive(DriveCmd)
}

/// Commands changing the executable's mode.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ModeCmd {
    Enable,
    Disable
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to the drivetrain.
pub(crate) fn exec(ds: &mut DataStore, cmd: &ExecCmd) {

    match cmd {
        ExecCmd::Mode(ModeCmd::Disable) => {
            debug!("Received Disable command");
            ds.disable(DisableCause::Command);
        },
        ExecCmd::Mode(ModeCmd::Enable) => {
            debug!("Received Enable command");
            if let Err(root_cause) = ds.enable(DisableCause::Command) {
                warn!("Cannot enable, the drivetrain was disabled by {:?}", root_cause);
            }
        },
        ExecCmd::Drive(d) => {
            if ds.drivetrain_input.cmd.is_some() {
                warn!("More than one drivetrain command this cycle, only the last is used");
            }
            ds.drivetrain_input.cmd = Some(*d);
        }
    }

    // Mode changes take effect on this cycle
    ds.drivetrain_input.disabled = ds.disabled;
}
