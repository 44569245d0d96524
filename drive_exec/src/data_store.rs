//! # Data Store

use log::{info, warn};

use crate::drive_ctrl;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the drivetrain has been disabled
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DisableCause {
    /// Every execution starts disabled until explicitly enabled.
    Startup,

    /// Disabled by command.
    Command,

    /// Too many consecutive cycle overruns.
    CycleOverruns
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    // Disable variables
    /// Determines if the drivetrain is disabled.
    pub disabled: bool,

    /// Gives the reason for the drivetrain being disabled.
    pub disable_cause: Option<DisableCause>,

    // Drivetrain
    pub drivetrain_input: drive_ctrl::InputData,
    pub drivetrain_output: drive_ctrl::OutputData,
    pub drivetrain_status_rpt: drive_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    /// A new data store, disabled by `DisableCause::Startup`.
    pub fn new() -> Self {
        Self {
            num_cycles: 0,
            disabled: true,
            disable_cause: Some(DisableCause::Startup),
            drivetrain_input: drive_ctrl::InputData { disabled: true, cmd: None },
            drivetrain_output: drive_ctrl::OutputData::default(),
            drivetrain_status_rpt: drive_ctrl::StatusReport::default(),
            num_consec_cycle_overruns: 0
        }
    }

    /// Disables the drivetrain with the given cause.
    pub fn disable(&mut self, cause: DisableCause) {
        if !self.disabled {
            warn!("Disable requested, cause: {:?}", cause);
            self.disabled = true;
            self.disable_cause = Some(cause);
        }
    }

    /// Attempts to enable the drivetrain by clearing the given cause.
    ///
    /// Returns `Ok(())` if the drivetrain is now enabled, or `Err(root_cause)`
    /// if the cause does not match the reason the drivetrain was disabled. An
    /// enable command also clears the startup disable.
    ///
    /// If the drivetrain was not disabled `Ok(())` is returned.
    pub fn enable(&mut self, cause: DisableCause) -> Result<(), DisableCause> {
        if !self.disabled {
            return Ok(());
        }

        match self.disable_cause {
            Some(root_cause) => {
                let startup_by_cmd = root_cause == DisableCause::Startup
                    && cause == DisableCause::Command;

                if cause == root_cause || startup_by_cmd {
                    self.disabled = false;
                    self.disable_cause = None;
                    info!("Enable requested, root cause ({:?}) cleared, drivetrain enabled", root_cause);
                    Ok(())
                } else {
                    Err(root_cause)
                }
            }
            None => {
                self.disabled = false;
                Ok(())
            }
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the drivetrain input, carrying over the disabled flag.
    pub fn cycle_start(&mut self) {
        self.drivetrain_input = drive_ctrl::InputData {
            disabled: self.disabled,
            cmd: None
        };
        self.drivetrain_status_rpt = drive_ctrl::StatusReport::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_starts_disabled() {
        let ds = DataStore::new();
        assert!(ds.disabled);
        assert_eq!(ds.disable_cause, Some(DisableCause::Startup));
        assert!(ds.drivetrain_input.disabled);
    }

    #[test]
    fn test_enable_requires_matching_cause() {
        let mut ds = DataStore::new();

        // Overrun recovery cannot clear the startup disable
        assert_eq!(ds.enable(DisableCause::CycleOverruns), Err(DisableCause::Startup));
        assert!(ds.disabled);

        ds.enable(DisableCause::Command).unwrap();
        assert!(!ds.disabled);

        ds.disable(DisableCause::CycleOverruns);
        ds.disable(DisableCause::Command);
        assert_eq!(ds.disable_cause, Some(DisableCause::CycleOverruns));

        assert_eq!(ds.enable(DisableCause::Command), Err(DisableCause::CycleOverruns));
        ds.enable(DisableCause::CycleOverruns).unwrap();
        assert!(!ds.disabled);

        // Enabling while enabled is fine
        ds.enable(DisableCause::Command).unwrap();
    }

    #[test]
    fn test_cycle_start_carries_disabled() {
        let mut ds = DataStore::new();
        ds.enable(DisableCause::Command).unwrap();
        ds.cycle_start();
        assert!(!ds.drivetrain_input.disabled);
        assert!(ds.drivetrain_input.cmd.is_none());
    }
}
