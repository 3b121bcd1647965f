//! fchat CLI library
//!
//! Exposes the script runner, output sink and config commands so they can
//! be tested without spawning the binary.

pub mod commands;
pub mod output;
pub mod script;

pub use output::MessageWriter;
pub use script::{ScriptFlow, ScriptRunner};
