//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use uds_core::config::{self, ConfigFile};

use super::resolve_config_path;

/// Show the effective configuration
///
/// Prints the file that would be loaded (if any) followed by the settings
/// after defaults and command line overrides are applied.
pub fn config_show(config_path: Option<&PathBuf>, effective: &ConfigFile) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'uds-echo config init' to create one");
    }
    println!();

    let content =
        toml::to_string_pretty(effective).context("Failed to serialize configuration")?;
    println!("{}", content);

    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ConfigFile::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

/// Print the config file location
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}
