//! `config` subcommands: inspect and edit the INI config file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use medingest::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value (key as section.key, e.g. fetch.timeout_secs)
    Get { key: String },

    /// Store one value
    Set { key: String, value: String },

    /// Print every setting, grouped by section
    List,

    /// Print the config file location
    Path,
}

/// Run a config subcommand against `path`, or the default file.
pub fn run(command: ConfigCommands, path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let config = ConfigFile::load_from(&path)?;
            println!("{}", display_value(&key.get(&config)));
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load_from(&path)?;
            key.set(&mut config, &value)?;
            config.save_to(&path)?;
            println!("{} = {}", key, display_value(&key.get(&config)));
        }
        ConfigCommands::List => list(&path)?,
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Run 'medingest config list' for the valid keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

fn list(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    println!("# {}", path.display());

    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            section = key.section();
            println!();
            println!("[{}]", section);
        }
        println!("{} = {}", key.key_name(), display_value(&key.get(&config)));
    }
    Ok(())
}
