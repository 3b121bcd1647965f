//! Control-script mini-language
//!
//! Scripts are plain text, one line per step. A line starting with one of
//! the `cmd:` prefixes below (and carrying something after it) is a command;
//! every other line is a chat message to be sent verbatim.
//!
//! ```text
//! cmd:sleep 250        pause the script for 250 ms
//! cmd:wait-for done    block until an inbound line reads "done"
//! cmd:exit 3           stop and exit with status 3
//! ```

use std::time::Duration;

use crate::error::ScriptError;

const SLEEP_PREFIX: &str = "cmd:sleep ";
const WAIT_FOR_PREFIX: &str = "cmd:wait-for ";
const EXIT_PREFIX: &str = "cmd:exit ";

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Pause for the given duration
    Sleep(Duration),
    /// Wait until an inbound line trims to this text
    WaitFor(String),
    /// Terminate with the given exit code
    Exit(i32),
    /// Send the line as a message
    Message(String),
}

/// Strip `prefix` if the line starts with it and has an argument after it
fn argument<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

impl ScriptCommand {
    /// Parse a script line.
    ///
    /// Returns `ScriptError` when a command prefix is present but its
    /// argument cannot be parsed; the caller is expected to log and skip
    /// the line.
    pub fn parse(line: &str) -> Result<Self, ScriptError> {
        if let Some(arg) = argument(line, SLEEP_PREFIX) {
            let value = arg.trim();
            let millis: u64 = value.parse().map_err(|e: std::num::ParseIntError| {
                ScriptError::InvalidSleep {
                    value: value.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(Self::Sleep(Duration::from_millis(millis)));
        }

        if let Some(arg) = argument(line, EXIT_PREFIX) {
            let value = arg.trim();
            let code: i32 = value.parse().map_err(|e: std::num::ParseIntError| {
                ScriptError::InvalidExitCode {
                    value: value.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(Self::Exit(code));
        }

        if let Some(arg) = argument(line, WAIT_FOR_PREFIX) {
            return Ok(Self::WaitFor(arg.trim().to_string()));
        }

        Ok(Self::Message(line.to_string()))
    }
}
