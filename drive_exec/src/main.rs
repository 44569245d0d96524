//! Main drivetrain executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise the drivetrain (in simulation)
//!     - Main loop:
//!         - Telecommand processing from the script
//!         - Drivetrain processing:
//!             - Module control
//!             - Pose estimation
//!         - Archiving
//! 
//! # Usage
//! 
//! `drive_exec <script_path>`, with `SWERVE_SW_ROOT` set to the directory
//! containing `params/`.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use drive_lib::{
    data_store::{DataStore, DisableCause},
    drive_ctrl::{Drivetrain, DrivetrainInit, ExecContext, Params, TelemetryRecord}
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use tc_processor::ExecCmd;
use util::{
    host, 
    module::State,
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
    script_interpreter::{ScriptInterpreter, Pending},
    time
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive cycle overruns after which the drivetrain is
/// disabled.
const MAX_CONSEC_CYCLE_OVERRUNS: u64 = 25;

/// Per-cycle chatter from these targets is capped at info.
const QUIET_LOG_TARGETS: [&str; 2] = [
    "drive_lib::kinematics",
    "drive_lib::module_ctrl"
];

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "drive_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &QUIET_LOG_TARGETS, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!("Running on: {}", host::platform_desc());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params = util::params::load("drivetrain.toml")
        .wrap_err("Could not load drivetrain params")?;
    let cycle_period_s = params.cycle_period_s;

    info!("Exec parameters loaded");

    // ---- LOAD SCRIPT ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let script_path = script_path(&args)?;

    info!("Loading script from \"{}\"", script_path);

    let mut script: ScriptInterpreter<ExecCmd> = ScriptInterpreter::new(script_path)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} commands\n",
        script.get_duration(),
        script.get_num_cmds()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::new();

    let mut drivetrain = Drivetrain::init(DrivetrainInit {
        params,
        context: ExecContext::Sim
    }).wrap_err("Failed to initialise the drivetrain")?;
    info!("Drivetrain init complete");

    let mut arch_drivetrain = Archiver::from_path(&session, "drivetrain.csv")
        .wrap_err("Failed to initialise the drivetrain archive")?;

    info!("Module initialisation complete, drivetrain is disabled until enabled\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        let script_time_s = time::cycle_time_s(ds.num_cycles, cycle_period_s);

        match script.get_pending(script_time_s) {
            Pending::None => (),
            Pending::Some(cmds) => {
                for cmd in cmds.iter() {
                    tc_processor::exec(&mut ds, cmd);
                }
            },
            // Exit if end of script reached
            Pending::EndOfScript => {
                info!("End of script reached, stopping");
                break
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match drivetrain.proc(&ds.drivetrain_input) {
            Ok((o, r)) => {
                ds.drivetrain_output = o;
                ds.drivetrain_status_rpt = r;
            },
            Err(e) => match e {}
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = arch_drivetrain.serialise(TelemetryRecord::from(&ds.drivetrain_output)) {
            warn!("Could not archive drivetrain telemetry: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(cycle_period_s)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                if ds.num_consec_cycle_overruns > 0 {
                    ds.enable(DisableCause::CycleOverruns).ok();
                }
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s", 
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > MAX_CONSEC_CYCLE_OVERRUNS {
                    if !ds.disabled {
                        error!(
                            "More than {} consecutive cycle overruns", 
                            MAX_CONSEC_CYCLE_OVERRUNS
                        );
                    }
                    ds.disable(DisableCause::CycleOverruns);
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    let pose = drivetrain.current_pose();
    info!(
        "Final pose: ({:.3}, {:.3}) m, {:.4} rad after {} cycles", 
        pose.x_m(), pose.y_m(), pose.heading_rad, ds.num_cycles
    );
    info!("End of execution");

    Ok(())
}

/// The script path, the only argument after the executable name.
fn script_path(args: &[String]) -> Result<&str, Report> {
    match args {
        [_, path] => Ok(path.as_str()),
        _ => Err(eyre!(
            "Expected one argument (the script path), found {}", 
            args.len().saturating_sub(1)
        ))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
