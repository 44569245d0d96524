//! # Script interpreter module
//!
//! Scripts are plain text files of timed JSON commands:
//!
//! ```text
//! 1.0: {"type": "Enable"};
//! 2.5: {"type": "Stop"};
//! ```
//!
//! The interpreter is generic over the command type, which must be
//! deserialisable from the JSON payload.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::Path;
use std::fs;
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct TimedCmd<C> {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    cmd: C
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending` to
/// acquire a list of commands that need executing.
pub struct ScriptInterpreter<C> {
    cmds: VecDeque<TimedCmd<C>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, serde_json::Error),

    #[error("Could not build the script regex: {0}")]
    RegexError(regex::Error)
}

/// Commands due for execution.
#[derive(Debug, PartialEq)]
pub enum Pending<C> {
    None,
    Some(Vec<C>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: DeserializeOwned> ScriptInterpreter<C> {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();
        
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path)
            .map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the script's contents.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut queue: VecDeque<TimedCmd<C>> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::RegexError)?;

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let cmd: C = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            queue.push_back(TimedCmd {
                exec_time_s,
                cmd
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            cmds: queue
        })
    }
}

impl<C> ScriptInterpreter<C> {
    /// Return the commands whose execution time is at or before
    /// `current_time_s`.
    pub fn get_pending(&mut self, current_time_s: f64) -> Pending<C> {

        // If the queue is empty the script is over
        if self.cmds.is_empty() {
            return Pending::EndOfScript
        }

        let mut cmd_vec: Vec<C> = vec![];

        while let Some(front) = self.cmds.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        if cmd_vec.is_empty() {
            Pending::None
        }
        else {
            Pending::Some(cmd_vec)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(tag = "type")]
    enum TestCmd {
        Go { speed: f64 },
        Halt
    }

    #[test]
    fn test_script_ordering() {
        let script = "\
            0.0: {\"type\": \"Go\", \"speed\": 1.5};\n\
            # comments are ignored\n\
            1.0: {\"type\": \"Halt\"};\n\
            1.0: {\"type\": \"Go\", \"speed\": 0.0};\n";

        let mut interp: ScriptInterpreter<TestCmd> = 
            ScriptInterpreter::from_str(script).unwrap();

        assert_eq!(interp.get_num_cmds(), 3);
        assert_eq!(interp.get_duration(), 1.0);

        assert_eq!(
            interp.get_pending(0.5), 
            Pending::Some(vec![TestCmd::Go { speed: 1.5 }])
        );
        assert_eq!(interp.get_pending(0.9), Pending::None);
        assert_eq!(
            interp.get_pending(1.0), 
            Pending::Some(vec![TestCmd::Halt, TestCmd::Go { speed: 0.0 }])
        );
        assert_eq!(interp.get_pending(2.0), Pending::EndOfScript);
    }

    #[test]
    fn test_script_errors() {
        let empty: Result<ScriptInterpreter<TestCmd>, _> = 
            ScriptInterpreter::from_str("nothing here");
        assert!(matches!(empty, Err(ScriptError::ScriptEmpty)));

        let bad: Result<ScriptInterpreter<TestCmd>, _> = 
            ScriptInterpreter::from_str("2.0: {\"type\": \"Fly\"};");
        assert!(matches!(bad, Err(ScriptError::InvalidCmd(t, _)) if t == 2.0));
    }
}
