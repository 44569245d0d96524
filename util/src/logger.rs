//! Logging setup for executables
//!
//! Every line is stamped with the seconds elapsed in the session and a three
//! letter level tag. The terminal copy of the log is coloured, the session's
//! log file is plain text.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{self, info, Level, Record};
use fern::{Dispatch, FormatCallback};
use colored::{ColoredString, Colorize};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error opening the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must be `Info` or more verbose.
/// - `quiet_targets` are capped at `Info` whatever `min_level` is. Use it for
///   modules which log every cycle at debug or trace.
/// - Can only succeed once per process.
pub fn logger_init(
    min_level: LevelFilter,
    quiet_targets: &[&'static str],
    session: &Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let terminal = Dispatch::new()
        .format(|out, message, record| {
            format_line(out, coloured_tag(record.level()), message, record)
        })
        .chain(std::io::stdout());

    let file = Dispatch::new()
        .format(|out, message, record| {
            format_line(out, level_tag(record.level()), message, record)
        })
        .chain(log_file);

    let mut root = Dispatch::new().level(min_level);
    for target in quiet_targets {
        root = root.level_for(*target, LevelFilter::Info);
    }

    root.chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    if !quiet_targets.is_empty() {
        info!("    Capped at info: {:?}", quiet_targets);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Write one line, with the target included for debug and trace.
fn format_line<T: std::fmt::Display>(
    out: FormatCallback,
    tag: T,
    message: &Arguments,
    record: &Record
) {
    let elapsed = session::get_elapsed_seconds();

    if record.level() > Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}", elapsed, tag, record.target(), message
        ))
    }
    else {
        out.finish(format_args!("[{:10.6} {}] {}", elapsed, tag, message))
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    }
}

fn coloured_tag(level: Level) -> ColoredString {
    let tag = level_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info  => tag.normal(),
        Level::Warn  => tag.yellow(),
        Level::Error => tag.red().bold()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn), "WRN");
        assert_eq!(level_tag(Level::Trace).len(), 3);
        assert!(coloured_tag(Level::Error).to_string().contains("ERR"));
    }
}
