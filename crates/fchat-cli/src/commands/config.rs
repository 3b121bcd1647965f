//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fchat_core::config::{self, ClientConfig};

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Print the effective configuration as TOML
pub fn config_show(effective: &ClientConfig) -> Result<String> {
    toml::to_string_pretty(effective).context("Failed to render configuration")
}

/// Path of the configuration file in use
pub fn config_path(config_path: Option<&Path>) -> PathBuf {
    resolve_path(config_path)
}

/// Look up a single value by dotted key (e.g. `reconnect.initial`)
pub fn config_get(effective: &ClientConfig, key: &str) -> Result<String> {
    let mut current = toml::Value::try_from(effective).context("Failed to render configuration")?;

    for part in key.split('.') {
        current = match current {
            toml::Value::Table(mut table) => table
                .remove(part)
                .ok_or_else(|| anyhow::anyhow!("Key not found: {}", key))?,
            _ => anyhow::bail!("Key not found: {}", key),
        };
    }

    Ok(match current {
        toml::Value::String(s) => s,
        toml::Value::Table(_) => toml::to_string_pretty(&current)?,
        other => other.to_string(),
    })
}

/// Write `effective` to the configuration file.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn config_init(
    config_path: Option<&Path>,
    effective: &ClientConfig,
    force: bool,
) -> Result<PathBuf> {
    let path = resolve_path(config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    config::save_config(&path, effective)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(path)
}
