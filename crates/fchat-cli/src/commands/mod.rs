//! Subcommand implementations

mod config;

pub use config::{config_get, config_init, config_path, config_show};
